//! Client API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::audit::{AuditAction, create_diff};
use crate::audit_log;
use crate::core::ServerState;
use crate::db::repository::client;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text,
};
use crate::utils::{AppError, AppResult};
use shared::models::{Client, ClientDetail, ClientUpdate};

const RESOURCE: &str = "client";

/// GET /api/clients - list active clients
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Client>>> {
    let clients = client::find_all(&state.pool).await?;
    Ok(Json(clients))
}

/// GET /api/clients/:id - client detail with origin linkage
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ClientDetail>> {
    let client = client::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Client {id}")))?;
    let source_enquiry_ids = client::source_enquiry_ids(&state.pool, id).await?;

    Ok(Json(ClientDetail {
        client,
        source_enquiry_ids,
    }))
}

/// PUT /api/clients/:id - secondary contact fields only
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ClientUpdate>,
) -> AppResult<Json<Client>> {
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.alternate_phone, "alternate_phone", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.nationality, "nationality", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.visa_type, "visa_type", MAX_NAME_LEN)?;
    validate_optional_text(
        &payload.destination_country,
        "destination_country",
        MAX_NAME_LEN,
    )?;

    let existing = client::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Client {id}")))?;

    let updated = client::update(&state.pool, id, payload).await?;
    let id_str = id.to_string();

    audit_log!(
        state.audit_service,
        AuditAction::ClientUpdated,
        RESOURCE, id_str.as_str(),
        operator_id = None,
        operator_name = None,
        details = create_diff(&existing, &updated, RESOURCE)
    );

    Ok(Json(updated))
}
