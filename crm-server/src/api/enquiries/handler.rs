//! Enquiry API Handlers
//!
//! Intake CRUD only. Conversion state (`is_client`/`client_id`) is never
//! writable from here; that pair belongs to the conversion engine.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::audit::{AuditAction, create_diff, create_snapshot};
use crate::audit_log;
use crate::core::ServerState;
use crate::db::repository::enquiry;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_email, validate_optional_text,
    validate_required_text,
};
use crate::utils::{AppError, AppResult};
use shared::models::{Enquiry, EnquiryCreate, EnquiryUpdate};

const RESOURCE: &str = "enquiry";

/// GET /api/enquiries - list active enquiries
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Enquiry>>> {
    let enquiries = enquiry::find_all(&state.pool).await?;
    Ok(Json(enquiries))
}

/// GET /api/enquiries/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Enquiry>> {
    let enquiry = enquiry::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Enquiry {id}")))?;
    Ok(Json(enquiry))
}

/// POST /api/enquiries - intake a new lead
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<EnquiryCreate>,
) -> AppResult<Json<Enquiry>> {
    validate_required_text(&payload.first_name, "first_name", MAX_NAME_LEN)?;
    validate_required_text(&payload.last_name, "last_name", MAX_NAME_LEN)?;
    validate_email(&payload.email, "email")?;
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.alternate_phone, "alternate_phone", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.nationality, "nationality", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.visa_type, "visa_type", MAX_NAME_LEN)?;
    validate_optional_text(
        &payload.destination_country,
        "destination_country",
        MAX_NAME_LEN,
    )?;

    let created = enquiry::create(&state.pool, payload).await?;
    let id = created.id.to_string();

    audit_log!(
        state.audit_service,
        AuditAction::EnquiryCreated,
        RESOURCE, id.as_str(),
        operator_id = None,
        operator_name = None,
        details = create_snapshot(&created, RESOURCE)
    );

    Ok(Json(created))
}

/// PUT /api/enquiries/:id
///
/// Once an enquiry is converted its contact fields are frozen (they were
/// the inputs to identity matching). Status and classification stay open.
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<EnquiryUpdate>,
) -> AppResult<Json<Enquiry>> {
    let existing = enquiry::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Enquiry {id}")))?;

    if existing.is_client && payload.touches_contact_fields() {
        return Err(AppError::business_rule(
            "Contact fields are frozen once an enquiry has been converted",
        ));
    }

    if let Some(ref first_name) = payload.first_name {
        validate_required_text(first_name, "first_name", MAX_NAME_LEN)?;
    }
    if let Some(ref last_name) = payload.last_name {
        validate_required_text(last_name, "last_name", MAX_NAME_LEN)?;
    }
    if let Some(ref email) = payload.email {
        validate_email(email, "email")?;
    }
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.alternate_phone, "alternate_phone", MAX_SHORT_TEXT_LEN)?;

    let updated = enquiry::update(&state.pool, id, payload).await?;
    let id_str = id.to_string();

    audit_log!(
        state.audit_service,
        AuditAction::EnquiryUpdated,
        RESOURCE, id_str.as_str(),
        operator_id = None,
        operator_name = None,
        details = create_diff(&existing, &updated, RESOURCE)
    );

    Ok(Json(updated))
}

/// DELETE /api/enquiries/:id - soft delete
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    let name_for_audit = enquiry::find_by_id(&state.pool, id)
        .await
        .ok()
        .flatten()
        .map(|e| format!("{} {}", e.first_name, e.last_name))
        .unwrap_or_default();

    let result = enquiry::delete(&state.pool, id).await?;
    let id_str = id.to_string();

    if result {
        audit_log!(
            state.audit_service,
            AuditAction::EnquiryDeleted,
            RESOURCE, id_str.as_str(),
            operator_id = None,
            operator_name = None,
            details = crate::audit::create_delete_details(&name_for_audit)
        );
    }

    Ok(Json(result))
}
