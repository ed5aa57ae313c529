//! Conversion API module
//!
//! The user-in-the-loop surface of the conversion engine, split into two
//! idempotent calls (`duplicate-check`, then `convert` with the caller's
//! decision) plus the operator repair entry point.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/enquiries", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/{id}/duplicate-check", get(handler::check_duplicate))
        .route("/{id}/convert", post(handler::convert))
        .route("/{id}/reconcile", post(handler::reconcile))
}
