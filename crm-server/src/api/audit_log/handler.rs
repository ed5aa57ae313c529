//! Audit Log API Handlers

use axum::{
    Json,
    extract::{Query, State},
};

use crate::audit::{AuditChainVerification, AuditListResponse, AuditQuery};
use crate::core::ServerState;
use crate::utils::AppResult;

/// GET /api/audit-log - query entries (newest first)
pub async fn query(
    State(state): State<ServerState>,
    Query(q): Query<AuditQuery>,
) -> AppResult<Json<AuditListResponse>> {
    let (items, total) = state.audit_service.query(&q).await?;
    Ok(Json(AuditListResponse { items, total }))
}

/// GET /api/audit-log/verify - hash-chain integrity check
pub async fn verify_chain(
    State(state): State<ServerState>,
) -> AppResult<Json<AuditChainVerification>> {
    let verification = state.audit_service.verify_chain().await?;
    Ok(Json(verification))
}
