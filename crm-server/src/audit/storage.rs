//! Audit log SQLite storage layer
//!
//! Append-only: no delete/update interface exists. A SHA256 hash chain
//! links every entry to its predecessor.

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

use super::types::{
    AuditAction, AuditChainBreak, AuditChainVerification, AuditEntry, AuditQuery,
};

/// Storage error
#[derive(Debug, Error)]
pub enum AuditStorageError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupt entry {0}: {1}")]
    Corrupt(i64, String),
}

impl From<sqlx::Error> for AuditStorageError {
    fn from(err: sqlx::Error) -> Self {
        AuditStorageError::Database(err.to_string())
    }
}

pub type AuditStorageResult<T> = Result<T, AuditStorageError>;

impl From<AuditStorageError> for crate::utils::AppError {
    fn from(err: AuditStorageError) -> Self {
        crate::utils::AppError::internal(err.to_string())
    }
}

/// Raw row shape; `action` and `details` are stored as TEXT.
#[derive(Debug, Clone, sqlx::FromRow)]
struct AuditRow {
    sequence: i64,
    timestamp: i64,
    action: String,
    resource_type: String,
    resource_id: String,
    operator_id: Option<String>,
    operator_name: Option<String>,
    details: String,
    prev_hash: String,
    curr_hash: String,
}

impl AuditRow {
    fn into_entry(self) -> AuditStorageResult<AuditEntry> {
        let action = AuditAction::parse(&self.action).ok_or_else(|| {
            AuditStorageError::Corrupt(self.sequence, format!("unknown action {}", self.action))
        })?;
        let details = serde_json::from_str(&self.details)?;
        Ok(AuditEntry {
            id: self.sequence,
            timestamp: self.timestamp,
            action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            operator_id: self.operator_id,
            operator_name: self.operator_name,
            details,
            prev_hash: self.prev_hash,
            curr_hash: self.curr_hash,
        })
    }
}

const AUDIT_SELECT: &str = "SELECT sequence, timestamp, action, resource_type, resource_id, operator_id, operator_name, details, prev_hash, curr_hash FROM audit_log";

/// Audit log storage (SQLite)
///
/// Only `append` and read methods exist; the table has no other writers.
#[derive(Clone)]
pub struct AuditStorage {
    pool: SqlitePool,
    /// Serializes appends to avoid sequence/hash read-modify-write races
    append_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AuditStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            append_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Append one audit entry.
    ///
    /// 1. Read the current max sequence and last hash
    /// 2. Compute this entry's hash
    /// 3. Insert
    pub async fn append(
        &self,
        action: AuditAction,
        resource_type: String,
        resource_id: String,
        operator_id: Option<String>,
        operator_name: Option<String>,
        details: serde_json::Value,
    ) -> AuditStorageResult<AuditEntry> {
        let _guard = self.append_lock.lock().await;

        let last = sqlx::query_as::<_, (i64, String)>(
            "SELECT sequence, curr_hash FROM audit_log ORDER BY sequence DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let (sequence, prev_hash) = match last {
            Some((seq, hash)) => (seq + 1, hash),
            None => (1, "genesis".to_string()),
        };

        let timestamp = shared::util::now_millis();
        let details_text = serde_json::to_string(&details)?;
        let curr_hash = compute_audit_hash(
            &prev_hash,
            sequence,
            timestamp,
            action.as_str(),
            &resource_type,
            &resource_id,
            operator_id.as_deref(),
            operator_name.as_deref(),
            &details_text,
        );

        sqlx::query(
            "INSERT INTO audit_log (sequence, timestamp, action, resource_type, resource_id, operator_id, operator_name, details, prev_hash, curr_hash) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(sequence)
        .bind(timestamp)
        .bind(action.as_str())
        .bind(&resource_type)
        .bind(&resource_id)
        .bind(&operator_id)
        .bind(&operator_name)
        .bind(&details_text)
        .bind(&prev_hash)
        .bind(&curr_hash)
        .execute(&self.pool)
        .await?;

        Ok(AuditEntry {
            id: sequence,
            timestamp,
            action,
            resource_type,
            resource_id,
            operator_id,
            operator_name,
            details,
            prev_hash,
            curr_hash,
        })
    }

    /// Query audit entries, newest first.
    pub async fn query(&self, q: &AuditQuery) -> AuditStorageResult<(Vec<AuditEntry>, i64)> {
        let mut conditions: Vec<&str> = Vec::new();
        if q.from.is_some() {
            conditions.push("timestamp >= ?");
        }
        if q.to.is_some() {
            conditions.push("timestamp <= ?");
        }
        if q.action.is_some() {
            conditions.push("action = ?");
        }
        if q.operator_id.is_some() {
            conditions.push("operator_id = ?");
        }
        if q.resource_type.is_some() {
            conditions.push("resource_type = ?");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM audit_log{where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(from) = q.from {
            count_query = count_query.bind(from);
        }
        if let Some(to) = q.to {
            count_query = count_query.bind(to);
        }
        if let Some(action) = q.action {
            count_query = count_query.bind(action.as_str());
        }
        if let Some(ref operator_id) = q.operator_id {
            count_query = count_query.bind(operator_id.as_str());
        }
        if let Some(ref resource_type) = q.resource_type {
            count_query = count_query.bind(resource_type.as_str());
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let list_sql = format!(
            "{AUDIT_SELECT}{where_clause} ORDER BY sequence DESC LIMIT ? OFFSET ?"
        );
        let mut list_query = sqlx::query_as::<_, AuditRow>(&list_sql);
        if let Some(from) = q.from {
            list_query = list_query.bind(from);
        }
        if let Some(to) = q.to {
            list_query = list_query.bind(to);
        }
        if let Some(action) = q.action {
            list_query = list_query.bind(action.as_str());
        }
        if let Some(ref operator_id) = q.operator_id {
            list_query = list_query.bind(operator_id.as_str());
        }
        if let Some(ref resource_type) = q.resource_type {
            list_query = list_query.bind(resource_type.as_str());
        }
        list_query = list_query.bind(q.limit as i64).bind(q.offset as i64);

        let rows = list_query.fetch_all(&self.pool).await?;
        let entries = rows
            .into_iter()
            .map(AuditRow::into_entry)
            .collect::<AuditStorageResult<Vec<_>>>()?;

        Ok((entries, total))
    }

    /// Verify the hash chain over the full log (ascending).
    pub async fn verify_chain(&self) -> AuditStorageResult<AuditChainVerification> {
        let sql = format!("{AUDIT_SELECT} ORDER BY sequence ASC");
        let rows = sqlx::query_as::<_, AuditRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let mut breaks = Vec::new();
        let mut expected_prev = "genesis".to_string();

        for row in &rows {
            if row.prev_hash != expected_prev {
                breaks.push(AuditChainBreak {
                    entry_id: row.sequence,
                    expected_prev_hash: expected_prev.clone(),
                    actual_prev_hash: row.prev_hash.clone(),
                });
            }
            let recomputed = compute_audit_hash(
                &row.prev_hash,
                row.sequence,
                row.timestamp,
                &row.action,
                &row.resource_type,
                &row.resource_id,
                row.operator_id.as_deref(),
                row.operator_name.as_deref(),
                &row.details,
            );
            if recomputed != row.curr_hash {
                breaks.push(AuditChainBreak {
                    entry_id: row.sequence,
                    expected_prev_hash: recomputed,
                    actual_prev_hash: row.curr_hash.clone(),
                });
            }
            expected_prev = row.curr_hash.clone();
        }

        Ok(AuditChainVerification {
            total_entries: rows.len() as i64,
            chain_intact: breaks.is_empty(),
            breaks,
        })
    }
}

/// Hash all stored fields plus the previous hash, NUL-separated.
#[allow(clippy::too_many_arguments)]
fn compute_audit_hash(
    prev_hash: &str,
    sequence: i64,
    timestamp: i64,
    action: &str,
    resource_type: &str,
    resource_id: &str,
    operator_id: Option<&str>,
    operator_name: Option<&str>,
    details: &str,
) -> String {
    let sequence = sequence.to_string();
    let timestamp = timestamp.to_string();

    let mut hasher = Sha256::new();
    for part in [
        prev_hash,
        sequence.as_str(),
        timestamp.as_str(),
        action,
        resource_type,
        resource_id,
        operator_id.unwrap_or(""),
        operator_name.unwrap_or(""),
        details,
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}
