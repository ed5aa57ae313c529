//! Enquiry Repository

use super::{RepoError, RepoResult};
use shared::models::{Enquiry, EnquiryCreate, EnquiryUpdate};
use sqlx::SqlitePool;

const ENQUIRY_SELECT: &str = "SELECT id, enquiry_no, first_name, last_name, email, phone, alternate_phone, nationality, visa_type, destination_country, enquiry_source, branch_id, enquiry_status, assigned_consultant, is_client, client_id, is_active, created_at, updated_at FROM enquiry";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Enquiry>> {
    let sql = format!(
        "{} WHERE is_active = 1 ORDER BY created_at DESC",
        ENQUIRY_SELECT
    );
    let rows = sqlx::query_as::<_, Enquiry>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Enquiry>> {
    let sql = format!("{} WHERE id = ?", ENQUIRY_SELECT);
    let row = sqlx::query_as::<_, Enquiry>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Transaction-scoped read, used by the conversion engine to re-check an
/// enquiry inside its commit transaction.
pub async fn find_by_id_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: i64,
) -> RepoResult<Option<Enquiry>> {
    let sql = format!("{} WHERE id = ?", ENQUIRY_SELECT);
    let row = sqlx::query_as::<_, Enquiry>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: EnquiryCreate) -> RepoResult<Enquiry> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let status = data.enquiry_status.unwrap_or_default();
    sqlx::query(
        "INSERT INTO enquiry (id, enquiry_no, first_name, last_name, email, phone, alternate_phone, nationality, visa_type, destination_country, enquiry_source, branch_id, enquiry_status, assigned_consultant, is_client, client_id, is_active, created_at, updated_at) \
         VALUES (?1, (SELECT COALESCE(MAX(enquiry_no), 1000) + 1 FROM enquiry), ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 0, NULL, 1, ?14, ?14)",
    )
    .bind(id)
    .bind(&data.first_name)
    .bind(&data.last_name)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(&data.alternate_phone)
    .bind(&data.nationality)
    .bind(&data.visa_type)
    .bind(&data.destination_country)
    .bind(&data.enquiry_source)
    .bind(data.branch_id)
    .bind(status.as_label())
    .bind(data.assigned_consultant)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create enquiry".into()))
}

/// CRUD update. Conversion state (`is_client`/`client_id`) is deliberately
/// untouchable here; only the conversion engine writes that pair.
pub async fn update(pool: &SqlitePool, id: i64, data: EnquiryUpdate) -> RepoResult<Enquiry> {
    let now = shared::util::now_millis();
    let status_label = data
        .enquiry_status
        .as_ref()
        .map(|s| s.as_label().to_string());
    let rows = sqlx::query(
        "UPDATE enquiry SET first_name = COALESCE(?1, first_name), last_name = COALESCE(?2, last_name), email = COALESCE(?3, email), phone = COALESCE(?4, phone), alternate_phone = COALESCE(?5, alternate_phone), nationality = COALESCE(?6, nationality), visa_type = COALESCE(?7, visa_type), destination_country = COALESCE(?8, destination_country), enquiry_source = COALESCE(?9, enquiry_source), branch_id = COALESCE(?10, branch_id), enquiry_status = COALESCE(?11, enquiry_status), assigned_consultant = COALESCE(?12, assigned_consultant), updated_at = ?13 WHERE id = ?14",
    )
    .bind(&data.first_name)
    .bind(&data.last_name)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(&data.alternate_phone)
    .bind(&data.nationality)
    .bind(&data.visa_type)
    .bind(&data.destination_country)
    .bind(&data.enquiry_source)
    .bind(data.branch_id)
    .bind(&status_label)
    .bind(data.assigned_consultant)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Enquiry {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Enquiry {id} not found")))
}

/// Soft delete. The conversion engine never deletes enquiries.
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE enquiry SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// The single transition the conversion engine may perform:
/// `is_client` false→true and `client_id` unset→set, exactly once.
///
/// Returns `false` when the enquiry was already converted (no row matched
/// the guard), which makes the reconciler's repair path idempotent.
pub async fn mark_converted(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: i64,
    client_id: i64,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE enquiry SET is_client = 1, client_id = ?1, updated_at = ?2 WHERE id = ?3 AND is_client = 0",
    )
    .bind(client_id)
    .bind(now)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Count enquiries pointing at a client (provenance checks in tests/ops).
pub async fn count_for_client(pool: &SqlitePool, client_id: i64) -> RepoResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM enquiry WHERE client_id = ? AND is_client = 1",
    )
    .bind(client_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
