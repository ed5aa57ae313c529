//! Team Member API Handlers
//!
//! The list endpoint populates the assignment choice shown before a
//! conversion is submitted.

use axum::{Json, extract::State};

use crate::audit::{AuditAction, create_snapshot};
use crate::audit_log;
use crate::core::ServerState;
use crate::db::repository::team_member;
use crate::utils::AppResult;
use crate::utils::validation::{MAX_NAME_LEN, validate_optional_text, validate_required_text};
use shared::models::{TeamMember, TeamMemberCreate};

const RESOURCE: &str = "team_member";

/// GET /api/team-members - list active consultants
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<TeamMember>>> {
    let members = team_member::find_all(&state.pool).await?;
    Ok(Json(members))
}

/// POST /api/team-members
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<TeamMemberCreate>,
) -> AppResult<Json<TeamMember>> {
    validate_required_text(&payload.display_name, "display_name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.email, "email", crate::utils::validation::MAX_EMAIL_LEN)?;

    let created = team_member::create(&state.pool, payload).await?;
    let id = created.id.to_string();

    audit_log!(
        state.audit_service,
        AuditAction::TeamMemberCreated,
        RESOURCE, id.as_str(),
        operator_id = None,
        operator_name = None,
        details = create_snapshot(&created, RESOURCE)
    );

    Ok(Json(created))
}
