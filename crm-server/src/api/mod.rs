//! API routing module
//!
//! # Structure
//!
//! - [`health`] - health check
//! - [`enquiries`] - enquiry intake CRUD
//! - [`conversion`] - duplicate check, convert, reconcile
//! - [`clients`] - client records and provenance
//! - [`team_members`] - consultant lookup
//! - [`audit_log`] - audit trail queries

pub mod audit_log;
pub mod clients;
pub mod conversion;
pub mod enquiries;
pub mod health;
pub mod team_members;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};
