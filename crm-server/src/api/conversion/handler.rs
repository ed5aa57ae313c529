//! Conversion API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::json;

use crate::audit::AuditAction;
use crate::audit_log;
use crate::conversion::{ConversionOutcome, ConversionRequest, DuplicateCheck};
use crate::core::ServerState;
use crate::utils::AppResult;

const RESOURCE: &str = "enquiry";

/// Conversion payload. `operator_*` feed the audit trail only.
#[derive(serde::Deserialize)]
pub struct ConvertPayload {
    pub assigned_team_member_id: Option<i64>,
    #[serde(default)]
    pub skip_assignment: bool,
    #[serde(default)]
    pub allow_duplicate: bool,
    pub merge_into_client_id: Option<i64>,
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct ReconcilePayload {
    pub assigned_team_member_id: Option<i64>,
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
}

/// GET /api/enquiries/:id/duplicate-check
///
/// Read-only first half of the conversion flow; safe to call repeatedly.
pub async fn check_duplicate(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DuplicateCheck>> {
    let check = state.conversion.check_duplicate(id).await?;
    Ok(Json(check))
}

/// POST /api/enquiries/:id/convert
pub async fn convert(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ConvertPayload>,
) -> AppResult<Json<ConversionOutcome>> {
    let req = ConversionRequest {
        enquiry_id: id,
        assigned_team_member_id: payload.assigned_team_member_id,
        skip_assignment: payload.skip_assignment,
        allow_duplicate: payload.allow_duplicate,
        merge_into_client_id: payload.merge_into_client_id,
    };

    let outcome = state.conversion.convert(&req).await?;
    let id_str = id.to_string();

    match &outcome {
        ConversionOutcome::Converted { client_id } => {
            audit_log!(
                state.audit_service,
                AuditAction::EnquiryConverted,
                RESOURCE, id_str.as_str(),
                operator_id = payload.operator_id.clone(),
                operator_name = payload.operator_name.clone(),
                details = json!({
                    "client_id": client_id,
                    "assigned_team_member_id": payload.assigned_team_member_id,
                })
            );
        }
        ConversionOutcome::Merged { client_id } => {
            audit_log!(
                state.audit_service,
                AuditAction::EnquiryMergedIntoClient,
                RESOURCE, id_str.as_str(),
                operator_id = payload.operator_id.clone(),
                operator_name = payload.operator_name.clone(),
                details = json!({
                    "client_id": client_id,
                    "confirmed": payload.merge_into_client_id.is_some(),
                })
            );
        }
        // Decision point: nothing was committed, nothing to journal.
        ConversionOutcome::Aborted { .. } => {}
    }

    Ok(Json(outcome))
}

/// POST /api/enquiries/:id/reconcile
///
/// Operator repair entry point for conversions that previously returned a
/// retryable conflict.
pub async fn reconcile(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ReconcilePayload>,
) -> AppResult<Json<ConversionOutcome>> {
    let outcome = state
        .conversion
        .reconcile(id, payload.assigned_team_member_id)
        .await?;
    let id_str = id.to_string();

    if let ConversionOutcome::Merged { client_id } = &outcome {
        audit_log!(
            state.audit_service,
            AuditAction::ConversionConflictRepaired,
            RESOURCE, id_str.as_str(),
            operator_id = payload.operator_id.clone(),
            operator_name = payload.operator_name.clone(),
            details = json!({ "client_id": client_id })
        );
    }

    Ok(Json(outcome))
}
