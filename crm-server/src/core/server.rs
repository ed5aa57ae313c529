//! Server Implementation
//!
//! Router assembly and HTTP server lifecycle.

use axum::{Router, middleware};
use serde_json::json;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::audit::AuditAction;
use crate::core::{Config, ServerState};
use crate::utils::AppError;

/// HTTP request access log middleware
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let status = response.status();
    tracing::info!(target: "http_access", "{} {} {}", method, uri, status);

    response
}

/// Build the Axum router (without state)
pub fn build_app() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(crate::api::health::router())
        // Data model APIs
        .merge(crate::api::enquiries::router())
        .merge(crate::api::clients::router())
        .merge(crate::api::team_members::router())
        // Conversion core
        .merge(crate::api::conversion::router())
        // Audit trail
        .merge(crate::api::audit_log::router())
}

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state (tests, embedded use)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<(), AppError> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await,
        };

        // Start background tasks (audit worker)
        state.start_background_tasks();

        let app = build_app()
            .with_state(state.clone())
            // Tower HTTP middleware
            .layer(CorsLayer::permissive())
            .layer(CompressionLayer::new())
            // HTTP request access log
            .layer(middleware::from_fn(log_request));

        if let Err(e) = state
            .audit_service
            .log_sync(
                AuditAction::SystemStartup,
                "system",
                "server:main",
                json!({ "environment": state.config.environment }),
            )
            .await
        {
            tracing::error!("Failed to journal startup: {:?}", e);
        }

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        tracing::info!("🗂️ CRM server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

        let shutdown_state = state.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down...");
                if let Err(e) = shutdown_state
                    .audit_service
                    .log_sync(
                        AuditAction::SystemShutdown,
                        "system",
                        "server:main",
                        json!({}),
                    )
                    .await
                {
                    tracing::error!("Failed to journal shutdown: {:?}", e);
                }
            })
            .await
            .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

        Ok(())
    }
}
