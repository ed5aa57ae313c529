//! CRM Server - visa-consultancy enquiry and client service
//!
//! # Architecture overview
//!
//! The service is a thin REST layer over SQLite with one subsystem that
//! carries real design weight: the enquiry-to-client **conversion engine**
//! (`conversion`), which promotes leads to clients while enforcing one
//! client per email under concurrent attempts.
//!
//! # Module structure
//!
//! ```text
//! crm-server/src/
//! ├── core/          # configuration, state, server lifecycle
//! ├── api/           # HTTP routes and handlers
//! ├── conversion/    # matcher, orchestrator, reconciler
//! ├── audit/         # append-only audit trail
//! ├── db/            # pool + per-table repositories
//! └── utils/         # errors, logging, validation
//! ```

pub mod api;
pub mod audit;
pub mod conversion;
pub mod core;
pub mod db;
pub mod utils;

// Re-export public types
pub use conversion::{ConversionEngine, ConversionError, ConversionOutcome, ConversionRequest};
pub use core::{Config, Server, ServerState};
pub use db::DbService;
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Audit logging macro - forwards to the audit service.
///
/// Keeps handler call sites to one expression:
///
/// ```ignore
/// audit_log!(state.audit_service, AuditAction::EnquiryCreated,
///     "enquiry", &id,
///     operator_id = None,
///     operator_name = None,
///     details = create_snapshot(&created, "enquiry"));
/// ```
#[macro_export]
macro_rules! audit_log {
    ($service:expr, $action:expr, $resource_type:expr, $resource_id:expr,
     operator_id = $operator_id:expr,
     operator_name = $operator_name:expr,
     details = $details:expr) => {
        $service
            .log(
                $action,
                $resource_type,
                $resource_id,
                $operator_id,
                $operator_name,
                $details,
            )
            .await
    };
}

/// Load `.env` and initialize logging. Call once at startup.
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   _____ _____  __  __
  / ____|  __ \|  \/  |
 | |    | |__) | \  / |
 | |    |  _  /| |\/| |
 | |____| | \ \| |  | |
  \_____|_|  \_\_|  |_|
    "#
    );
}
