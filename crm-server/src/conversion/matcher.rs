//! Identity Matcher
//!
//! Answers "does a client already exist for this contact identity?".
//! Matching is an exact comparison on the normalized email. Phone is
//! carried for display only and is never an independent match key.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::repository::{RepoResult, client};

/// A client that already holds the candidate identity.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityMatch {
    pub matched_client_id: i64,
    pub matched_email: String,
}

/// Normalize an email for identity comparison: trim + lowercase.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Pure read: look up the client currently holding this identity.
///
/// A lookup failure propagates as an error and is never collapsed into
/// "no match"; assuming no-match on a broken read is how duplicate
/// clients get created.
pub async fn find_match(pool: &SqlitePool, email: &str) -> RepoResult<Option<IdentityMatch>> {
    let normalized = normalize_email(email);
    let found = client::find_by_normalized_email(pool, &normalized).await?;
    Ok(found.map(|c| IdentityMatch {
        matched_client_id: c.id,
        matched_email: c.email,
    }))
}
