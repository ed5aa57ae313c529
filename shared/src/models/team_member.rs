//! Team Member Model

use serde::{Deserialize, Serialize};

/// Team member (consultant): the assignment target for conversions.
///
/// Read-only to the conversion engine; treated as a static lookup fetched
/// just-in-time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TeamMember {
    pub id: i64,
    pub display_name: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create team member payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMemberCreate {
    pub display_name: String,
    pub email: Option<String>,
}
