//! Conflict Reconciler
//!
//! Repairs the race window between the duplicate pre-check and the
//! optimistic client insert. When the unique email index rejects a commit,
//! another conversion has already landed for the same identity; instead of
//! failing, the losing enquiry is merged into the winning client.
//!
//! The whole repair is idempotent: re-running it appends nothing twice and
//! never reassigns ownership.

use sqlx::SqlitePool;

use shared::models::Enquiry;

use super::error::ConversionError;
use super::matcher;
use crate::db::repository::{client, enquiry};

/// Resolve the client that won the colliding email and merge the enquiry
/// into it. Returns the resolved client id.
///
/// Fails with `ConflictUnresolved` when no client currently holds the
/// email (a transient read-after-write visibility gap). The enquiry is
/// left unconverted, never half-converted.
pub(crate) async fn reconcile(
    pool: &SqlitePool,
    enquiry: &Enquiry,
    assigned_to: Option<i64>,
) -> Result<i64, ConversionError> {
    // The matcher is authoritative now: the conflicting write has landed.
    let matched = matcher::find_match(pool, &enquiry.email)
        .await?
        .ok_or_else(|| {
            ConversionError::ConflictUnresolved(format!(
                "no client currently holds the email of enquiry {}",
                enquiry.id
            ))
        })?;

    merge_into(pool, enquiry, matched.matched_client_id, assigned_to).await
}

/// Merge an enquiry into an existing client as one transaction: append
/// the source link, take ownership only if nobody holds it, mark the
/// enquiry converted.
pub(crate) async fn merge_into(
    pool: &SqlitePool,
    enquiry: &Enquiry,
    client_id: i64,
    assigned_to: Option<i64>,
) -> Result<i64, ConversionError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ConversionError::Transport(e.to_string()))?;

    let appended = client::append_source_enquiry(&mut tx, client_id, enquiry.id).await?;
    if !appended {
        tracing::debug!(
            enquiry_id = enquiry.id,
            client_id,
            "Enquiry already linked to client, skipping append"
        );
    }

    if let Some(team_member_id) = assigned_to {
        // First writer wins: an existing assignment is never overwritten.
        let won = client::assign_if_unassigned(&mut tx, client_id, team_member_id).await?;
        if !won {
            tracing::debug!(
                client_id,
                team_member_id,
                "Client already has an assignee, keeping the first writer"
            );
        }
    }

    let transitioned = enquiry::mark_converted(&mut tx, enquiry.id, client_id).await?;
    if !transitioned {
        tracing::debug!(
            enquiry_id = enquiry.id,
            "Enquiry already marked converted, repair is a no-op"
        );
    }

    tx.commit()
        .await
        .map_err(|e| ConversionError::Transport(e.to_string()))?;

    Ok(client_id)
}
