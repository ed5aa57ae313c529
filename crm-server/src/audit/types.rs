//! Audit log type definitions
//!
//! Entries are immutable and hash-chained; see the module docs.

use serde::{Deserialize, Serialize};

/// Audit action type (enum, not free text)
///
/// Grouped by domain so every sensitive operation has a stable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // ═══ System lifecycle ═══
    /// Normal server startup
    SystemStartup,
    /// Normal server shutdown
    SystemShutdown,

    // ═══ Intake CRUD ═══
    EnquiryCreated,
    EnquiryUpdated,
    EnquiryDeleted,
    ClientUpdated,
    TeamMemberCreated,

    // ═══ Conversion (workflow-critical) ═══
    /// Enquiry promoted to a brand-new client
    EnquiryConverted,
    /// Enquiry merged into an existing client (confirmed duplicate)
    EnquiryMergedIntoClient,
    /// Lost conversion race repaired by the reconciler
    ConversionConflictRepaired,
}

impl AuditAction {
    /// Stable storage label (matches the serde snake_case form).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemStartup => "system_startup",
            Self::SystemShutdown => "system_shutdown",
            Self::EnquiryCreated => "enquiry_created",
            Self::EnquiryUpdated => "enquiry_updated",
            Self::EnquiryDeleted => "enquiry_deleted",
            Self::ClientUpdated => "client_updated",
            Self::TeamMemberCreated => "team_member_created",
            Self::EnquiryConverted => "enquiry_converted",
            Self::EnquiryMergedIntoClient => "enquiry_merged_into_client",
            Self::ConversionConflictRepaired => "conversion_conflict_repaired",
        }
    }

    /// Parse a stored label back into the enum.
    pub fn parse(label: &str) -> Option<Self> {
        Some(match label {
            "system_startup" => Self::SystemStartup,
            "system_shutdown" => Self::SystemShutdown,
            "enquiry_created" => Self::EnquiryCreated,
            "enquiry_updated" => Self::EnquiryUpdated,
            "enquiry_deleted" => Self::EnquiryDeleted,
            "client_updated" => Self::ClientUpdated,
            "team_member_created" => Self::TeamMemberCreated,
            "enquiry_converted" => Self::EnquiryConverted,
            "enquiry_merged_into_client" => Self::EnquiryMergedIntoClient,
            "conversion_conflict_repaired" => Self::ConversionConflictRepaired,
            _ => return None,
        })
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit log entry (immutable)
///
/// Every record carries a SHA256 hash chain:
/// - `prev_hash`: hash of the previous record
/// - `curr_hash`: hash of this record (prev_hash + all fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Globally increasing sequence number (unique identifier)
    pub id: i64,
    /// Unix milliseconds
    pub timestamp: i64,
    pub action: AuditAction,
    /// Resource type ("enquiry", "client", "system", ...)
    pub resource_type: String,
    pub resource_id: String,
    /// Operator id (None for system events)
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
    /// Structured details (JSON)
    pub details: serde_json::Value,
    pub prev_hash: String,
    pub curr_hash: String,
}

/// Audit log query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct AuditQuery {
    /// Start timestamp (Unix millis, inclusive)
    pub from: Option<i64>,
    /// End timestamp (Unix millis, inclusive)
    pub to: Option<i64>,
    pub action: Option<AuditAction>,
    pub operator_id: Option<String>,
    pub resource_type: Option<String>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Audit log list response
#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub items: Vec<AuditEntry>,
    pub total: i64,
}

/// Chain verification result
#[derive(Debug, Serialize)]
pub struct AuditChainVerification {
    pub total_entries: i64,
    pub chain_intact: bool,
    pub breaks: Vec<AuditChainBreak>,
}

/// A break in the hash chain
#[derive(Debug, Serialize)]
pub struct AuditChainBreak {
    pub entry_id: i64,
    pub expected_prev_hash: String,
    pub actual_prev_hash: String,
}
