//! Team Member Repository
//!
//! Read-mostly lookup collection; the conversion engine only ever reads it.

use super::{RepoError, RepoResult};
use shared::models::{TeamMember, TeamMemberCreate};
use sqlx::SqlitePool;

const TEAM_MEMBER_SELECT: &str =
    "SELECT id, display_name, email, is_active, created_at, updated_at FROM team_member";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<TeamMember>> {
    let sql = format!(
        "{} WHERE is_active = 1 ORDER BY display_name",
        TEAM_MEMBER_SELECT
    );
    let rows = sqlx::query_as::<_, TeamMember>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<TeamMember>> {
    let sql = format!("{} WHERE id = ? AND is_active = 1", TEAM_MEMBER_SELECT);
    let row = sqlx::query_as::<_, TeamMember>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: TeamMemberCreate) -> RepoResult<TeamMember> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO team_member (id, display_name, email, is_active, created_at, updated_at) VALUES (?1, ?2, ?3, 1, ?4, ?4)",
    )
    .bind(id)
    .bind(&data.display_name)
    .bind(&data.email)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create team member".into()))
}
