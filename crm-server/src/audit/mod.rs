//! Audit log module: append-only operational audit trail
//!
//! # Architecture
//!
//! ```text
//! sensitive operation
//!   └─ AuditService::log() → mpsc → AuditWorker → SQLite (audit_log table)
//!
//! SHA256 hash chain: genesis → entry₁ → entry₂ → ... → entryₙ
//! ```
//!
//! # Tamper evidence
//!
//! - **SHA256 hash chain**: every entry carries the previous entry's hash
//! - **Append-only**: no update/delete interface exists
//! - **Chain verification**: `verify_chain` recomputes the whole chain
//!
//! Conversion decisions (create, merge, conflict repair) are journaled
//! here alongside the intake CRUD trail.

pub mod diff;
pub mod service;
pub mod storage;
pub mod types;
pub mod worker;

pub use diff::{create_delete_details, create_diff, create_snapshot};
pub use service::{AuditLogRequest, AuditService};
pub use storage::{AuditStorage, AuditStorageError};
pub use types::{
    AuditAction, AuditChainBreak, AuditChainVerification, AuditEntry, AuditListResponse,
    AuditQuery,
};
pub use worker::AuditWorker;
