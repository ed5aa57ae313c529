//! Audit log service
//!
//! `AuditService` is the write/read front for the audit trail:
//! - writes go through an mpsc channel to the background worker
//! - queries and chain verification read storage directly
//!
//! When auditing is disabled by configuration, `log` becomes a no-op so
//! call sites don't have to branch.

use std::sync::Arc;
use tokio::sync::mpsc;

use super::storage::{AuditStorage, AuditStorageError};
use super::types::*;

/// Log request delivered to the background worker
pub struct AuditLogRequest {
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: String,
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
    pub details: serde_json::Value,
}

/// Audit log service
pub struct AuditService {
    storage: AuditStorage,
    tx: mpsc::Sender<AuditLogRequest>,
    enabled: bool,
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl AuditService {
    /// Create the service plus the receiver half for the worker.
    pub fn new(
        storage: AuditStorage,
        buffer_size: usize,
        enabled: bool,
    ) -> (Arc<Self>, mpsc::Receiver<AuditLogRequest>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        let service = Arc::new(Self {
            storage,
            tx,
            enabled,
        });
        (service, rx)
    }

    /// Record an audit entry asynchronously (non-blocking for the handler).
    ///
    /// If the channel is full this waits; audit entries are not dropped
    /// under load.
    pub async fn log(
        &self,
        action: AuditAction,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        operator_id: Option<String>,
        operator_name: Option<String>,
        details: serde_json::Value,
    ) {
        if !self.enabled {
            return;
        }

        let req = AuditLogRequest {
            action,
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            operator_id,
            operator_name,
            details,
        };

        if self.tx.send(req).await.is_err() {
            tracing::error!("Audit log channel closed — audit entry lost!");
        }
    }

    /// Write an entry synchronously (startup/shutdown events).
    pub async fn log_sync(
        &self,
        action: AuditAction,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        details: serde_json::Value,
    ) -> Result<AuditEntry, AuditStorageError> {
        self.storage
            .append(
                action,
                resource_type.into(),
                resource_id.into(),
                None,
                None,
                details,
            )
            .await
    }

    /// Query audit entries.
    pub async fn query(
        &self,
        q: &AuditQuery,
    ) -> Result<(Vec<AuditEntry>, i64), AuditStorageError> {
        self.storage.query(q).await
    }

    /// Verify hash-chain integrity.
    pub async fn verify_chain(&self) -> Result<AuditChainVerification, AuditStorageError> {
        self.storage.verify_chain().await
    }

    /// Storage handle (for the worker).
    pub fn storage(&self) -> &AuditStorage {
        &self.storage
    }
}
