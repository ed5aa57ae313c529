//! Client Repository
//!
//! The `email_normalized` unique index is enforced here by the store, not
//! by application locks; concurrent conversions race on the insert and the
//! loser sees `RepoError::Duplicate`.

use super::{RepoError, RepoResult};
use shared::models::{Client, ClientUpdate, Enquiry};
use sqlx::SqlitePool;

const CLIENT_SELECT: &str = "SELECT id, client_no, first_name, last_name, email, email_normalized, phone, alternate_phone, nationality, visa_type, destination_country, assigned_to, is_active, created_at, updated_at FROM client";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Client>> {
    let sql = format!(
        "{} WHERE is_active = 1 ORDER BY created_at DESC",
        CLIENT_SELECT
    );
    let rows = sqlx::query_as::<_, Client>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Client>> {
    let sql = format!("{} WHERE id = ?", CLIENT_SELECT);
    let row = sqlx::query_as::<_, Client>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Identity lookup: exact match on the normalized email.
pub async fn find_by_normalized_email(
    pool: &SqlitePool,
    email_normalized: &str,
) -> RepoResult<Option<Client>> {
    let sql = format!("{} WHERE email_normalized = ?", CLIENT_SELECT);
    let row = sqlx::query_as::<_, Client>(&sql)
        .bind(email_normalized)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Seed a new client from an enquiry's contact fields, inside the caller's
/// commit transaction. The unique email index may reject the insert; the
/// caller receives that as [`RepoError::Duplicate`] and must repair, not
/// report.
pub async fn create_from_enquiry(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    enquiry: &Enquiry,
    email_normalized: &str,
    assigned_to: Option<i64>,
) -> RepoResult<Client> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO client (id, client_no, first_name, last_name, email, email_normalized, phone, alternate_phone, nationality, visa_type, destination_country, assigned_to, is_active, created_at, updated_at) \
         VALUES (?1, (SELECT COALESCE(MAX(client_no), 1000) + 1 FROM client), ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, ?12, ?12)",
    )
    .bind(id)
    .bind(&enquiry.first_name)
    .bind(&enquiry.last_name)
    .bind(&enquiry.email)
    .bind(email_normalized)
    .bind(&enquiry.phone)
    .bind(&enquiry.alternate_phone)
    .bind(&enquiry.nationality)
    .bind(&enquiry.visa_type)
    .bind(&enquiry.destination_country)
    .bind(assigned_to)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    let sql = format!("{} WHERE id = ?", CLIENT_SELECT);
    let row = sqlx::query_as::<_, Client>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    row.ok_or_else(|| RepoError::Database("Failed to create client".into()))
}

/// Append an enquiry to the client's ordered source set.
///
/// Idempotent: the composite primary key turns a re-append into a no-op.
/// Returns whether a new link was written.
pub async fn append_source_enquiry(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    client_id: i64,
    enquiry_id: i64,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "INSERT INTO client_source_enquiry (client_id, enquiry_id, position, created_at) \
         VALUES (?1, ?2, (SELECT COUNT(*) FROM client_source_enquiry WHERE client_id = ?1), ?3) \
         ON CONFLICT (client_id, enquiry_id) DO NOTHING",
    )
    .bind(client_id)
    .bind(enquiry_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// First-writer-wins ownership: set `assigned_to` only while unset.
/// Returns whether this call won the assignment.
pub async fn assign_if_unassigned(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    client_id: i64,
    team_member_id: i64,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE client SET assigned_to = ?1, updated_at = ?2 WHERE id = ?3 AND assigned_to IS NULL",
    )
    .bind(team_member_id)
    .bind(now)
    .bind(client_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Enquiry ids that contributed to this client, in merge order.
pub async fn source_enquiry_ids(pool: &SqlitePool, client_id: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT enquiry_id FROM client_source_enquiry WHERE client_id = ? ORDER BY position, created_at",
    )
    .bind(client_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// CRUD update for secondary contact fields. The natural key (`email`)
/// and ownership (`assigned_to`) are not editable here.
pub async fn update(pool: &SqlitePool, id: i64, data: ClientUpdate) -> RepoResult<Client> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE client SET phone = COALESCE(?1, phone), alternate_phone = COALESCE(?2, alternate_phone), nationality = COALESCE(?3, nationality), visa_type = COALESCE(?4, visa_type), destination_country = COALESCE(?5, destination_country), is_active = COALESCE(?6, is_active), updated_at = ?7 WHERE id = ?8",
    )
    .bind(&data.phone)
    .bind(&data.alternate_phone)
    .bind(&data.nationality)
    .bind(&data.visa_type)
    .bind(&data.destination_country)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Client {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Client {id} not found")))
}

/// Count of clients holding a normalized email (0 or 1 by invariant).
pub async fn count_by_normalized_email(
    pool: &SqlitePool,
    email_normalized: &str,
) -> RepoResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM client WHERE email_normalized = ?",
    )
    .bind(email_normalized)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
