//! Conversion Orchestrator
//!
//! Single entry point that turns an enquiry into a committed client
//! assignment. Validates before any write, runs the duplicate pre-check,
//! then commits optimistically: create client + link source + mark enquiry
//! as one transaction. Losing the uniqueness race hands off to the
//! reconciler instead of surfacing an error.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use shared::models::Enquiry;

use super::error::ConversionError;
use super::matcher;
use super::reconciler;
use crate::db::repository::{RepoError, client, enquiry, team_member};

/// One conversion attempt, as submitted by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversionRequest {
    pub enquiry_id: i64,
    /// Mandatory on the primary flow; see `skip_assignment`.
    pub assigned_team_member_id: Option<i64>,
    /// Legacy intake path that defers consultant assignment.
    #[serde(default)]
    pub skip_assignment: bool,
    /// Skip the duplicate pre-check; the caller takes responsibility for
    /// the outcome (a collision still ends in a merge, never a failure).
    #[serde(default)]
    pub allow_duplicate: bool,
    /// Confirmed merge target from a prior duplicate check.
    pub merge_into_client_id: Option<i64>,
}

/// Result of a conversion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status")]
pub enum ConversionOutcome {
    /// A fresh client was created from the enquiry.
    Converted { client_id: i64 },
    /// The enquiry was merged into an existing client.
    Merged { client_id: i64 },
    /// A duplicate was detected and the caller has not confirmed a
    /// decision. Nothing was written.
    Aborted { matched_client_id: i64 },
}

/// Outcome of the read-only duplicate pre-check.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateCheck {
    pub enquiry_id: i64,
    pub duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_client_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_email: Option<String>,
}

/// Commit-phase failure, kept internal to the orchestrator.
enum CommitError {
    /// The unique email index rejected the insert: another conversion
    /// won the race between pre-check and commit.
    Raced,
    Failed(ConversionError),
}

impl From<RepoError> for CommitError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate(_) => CommitError::Raced,
            other => CommitError::Failed(other.into()),
        }
    }
}

/// Conversion engine, orchestrating over the shared pool.
#[derive(Clone)]
pub struct ConversionEngine {
    pool: SqlitePool,
}

impl std::fmt::Debug for ConversionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionEngine").finish_non_exhaustive()
    }
}

impl ConversionEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// First half of the user-in-the-loop split: report whether the
    /// enquiry's identity already belongs to a client. Pure read,
    /// idempotent, writes nothing.
    pub async fn check_duplicate(
        &self,
        enquiry_id: i64,
    ) -> Result<DuplicateCheck, ConversionError> {
        let enquiry = self.load_convertible(enquiry_id).await?;
        let matched = matcher::find_match(&self.pool, &enquiry.email).await?;
        Ok(DuplicateCheck {
            enquiry_id,
            duplicate: matched.is_some(),
            matched_client_id: matched.as_ref().map(|m| m.matched_client_id),
            matched_email: matched.map(|m| m.matched_email),
        })
    }

    /// Convert an enquiry into a client.
    ///
    /// A transport failure re-runs the whole check-then-act sequence once;
    /// nothing ever resumes mid-commit, so a retry can never double-create.
    pub async fn convert(
        &self,
        req: &ConversionRequest,
    ) -> Result<ConversionOutcome, ConversionError> {
        match self.try_convert(req).await {
            Err(ConversionError::Transport(msg)) => {
                tracing::warn!(
                    enquiry_id = req.enquiry_id,
                    error = %msg,
                    "Conversion hit a transport failure, retrying the full sequence once"
                );
                self.try_convert(req).await
            }
            other => other,
        }
    }

    /// Operator-invoked repair path for conversions that previously
    /// returned `ConflictUnresolved`. Idempotent: re-running it against an
    /// already-repaired enquiry just reports the resolved client.
    pub async fn reconcile(
        &self,
        enquiry_id: i64,
        assigned_team_member_id: Option<i64>,
    ) -> Result<ConversionOutcome, ConversionError> {
        let enquiry = enquiry::find_by_id(&self.pool, enquiry_id)
            .await?
            .ok_or(ConversionError::NotFound(enquiry_id))?;

        if enquiry.is_client {
            return match enquiry.client_id {
                Some(client_id) => Ok(ConversionOutcome::Merged { client_id }),
                None => Err(ConversionError::ConflictUnresolved(format!(
                    "enquiry {enquiry_id} is marked converted but holds no client reference"
                ))),
            };
        }

        validate_identity_fields(&enquiry)?;
        let assigned_to = match assigned_team_member_id {
            Some(id) => Some(self.require_team_member(id).await?),
            None => None,
        };

        let client_id = reconciler::reconcile(&self.pool, &enquiry, assigned_to).await?;
        Ok(ConversionOutcome::Merged { client_id })
    }

    async fn try_convert(
        &self,
        req: &ConversionRequest,
    ) -> Result<ConversionOutcome, ConversionError> {
        // 1. Load and validate the enquiry before any write.
        let enquiry = self.load_convertible(req.enquiry_id).await?;
        validate_identity_fields(&enquiry)?;

        // 2. Resolve the assignment target.
        let assigned_to = self.resolve_assignment(req).await?;

        // 3. Confirmed merge: the caller already chose the target.
        if let Some(target_id) = req.merge_into_client_id {
            return self.commit_merge(&enquiry, target_id, assigned_to).await;
        }

        // 4. Duplicate pre-check. A match is a user-facing decision point:
        //    never merge silently on first detection.
        if !req.allow_duplicate
            && let Some(matched) = matcher::find_match(&self.pool, &enquiry.email).await?
        {
            return Ok(ConversionOutcome::Aborted {
                matched_client_id: matched.matched_client_id,
            });
        }

        // 5. Optimistic commit. The unique email index is the arbiter;
        //    losing the race is repaired, not reported.
        match self.commit_create(&enquiry, assigned_to).await {
            Ok(outcome) => Ok(outcome),
            Err(CommitError::Raced) => {
                tracing::info!(
                    enquiry_id = enquiry.id,
                    "Conversion lost the uniqueness race, reconciling into the winner"
                );
                let client_id =
                    reconciler::reconcile(&self.pool, &enquiry, assigned_to).await?;
                Ok(ConversionOutcome::Merged { client_id })
            }
            Err(CommitError::Failed(err)) => Err(err),
        }
    }

    /// Create-new commit: client row + source link + enquiry transition,
    /// all inside one transaction so an abort leaves no partial state.
    async fn commit_create(
        &self,
        enquiry: &Enquiry,
        assigned_to: Option<i64>,
    ) -> Result<ConversionOutcome, CommitError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CommitError::Failed(ConversionError::Transport(e.to_string())))?;

        // Re-read inside the transaction: the enquiry must still be
        // unconverted and its matching identity unchanged since the
        // pre-check. Contact fields are immutable once conversion begins.
        let current = enquiry::find_by_id_tx(&mut tx, enquiry.id)
            .await?
            .ok_or(CommitError::Failed(ConversionError::NotFound(enquiry.id)))?;
        if current.is_client {
            return Err(CommitError::Failed(ConversionError::AlreadyConverted(
                enquiry.id,
            )));
        }
        let email_normalized = matcher::normalize_email(&current.email);
        if email_normalized != matcher::normalize_email(&enquiry.email) {
            return Err(CommitError::Failed(ConversionError::Validation(
                "enquiry contact fields changed while conversion was in flight".into(),
            )));
        }

        let created =
            client::create_from_enquiry(&mut tx, enquiry, &email_normalized, assigned_to).await?;
        client::append_source_enquiry(&mut tx, created.id, enquiry.id).await?;
        let transitioned = enquiry::mark_converted(&mut tx, enquiry.id, created.id).await?;
        if !transitioned {
            return Err(CommitError::Failed(ConversionError::AlreadyConverted(
                enquiry.id,
            )));
        }

        tx.commit()
            .await
            .map_err(|e| CommitError::from(RepoError::from(e)))?;

        Ok(ConversionOutcome::Converted {
            client_id: created.id,
        })
    }

    /// User-confirmed merge into a previously matched client.
    async fn commit_merge(
        &self,
        enquiry: &Enquiry,
        target_id: i64,
        assigned_to: Option<i64>,
    ) -> Result<ConversionOutcome, ConversionError> {
        let target = client::find_by_id(&self.pool, target_id)
            .await?
            .ok_or_else(|| {
                ConversionError::Validation(format!("merge target client {target_id} not found"))
            })?;

        // The confirmation came from an earlier duplicate check; the
        // target must still hold the enquiry's identity.
        if target.email_normalized != matcher::normalize_email(&enquiry.email) {
            return Err(ConversionError::Validation(format!(
                "client {} no longer matches the enquiry email",
                target.id
            )));
        }

        let client_id =
            reconciler::merge_into(&self.pool, enquiry, target.id, assigned_to).await?;
        Ok(ConversionOutcome::Merged { client_id })
    }

    async fn load_convertible(&self, enquiry_id: i64) -> Result<Enquiry, ConversionError> {
        let enquiry = enquiry::find_by_id(&self.pool, enquiry_id)
            .await?
            .ok_or(ConversionError::NotFound(enquiry_id))?;
        if enquiry.is_client {
            return Err(ConversionError::AlreadyConverted(enquiry_id));
        }
        Ok(enquiry)
    }

    async fn resolve_assignment(
        &self,
        req: &ConversionRequest,
    ) -> Result<Option<i64>, ConversionError> {
        if req.skip_assignment {
            return Ok(None);
        }
        let id = req
            .assigned_team_member_id
            .ok_or(ConversionError::AssignmentRequired)?;
        Ok(Some(self.require_team_member(id).await?))
    }

    async fn require_team_member(&self, id: i64) -> Result<i64, ConversionError> {
        let member = team_member::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| {
                ConversionError::Validation(format!("team member {id} not found"))
            })?;
        Ok(member.id)
    }
}

/// Minimum viable identity for a client record: non-empty names and an
/// email to match on. Caller input problems, not server faults.
fn validate_identity_fields(enquiry: &Enquiry) -> Result<(), ConversionError> {
    if enquiry.first_name.trim().is_empty() {
        return Err(ConversionError::Validation(
            "enquiry has no first name".into(),
        ));
    }
    if enquiry.last_name.trim().is_empty() {
        return Err(ConversionError::Validation(
            "enquiry has no last name".into(),
        ));
    }
    if enquiry.email.trim().is_empty() {
        return Err(ConversionError::Validation("enquiry has no email".into()));
    }
    Ok(())
}
