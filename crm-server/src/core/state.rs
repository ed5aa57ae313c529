//! Server state

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::audit::{AuditLogRequest, AuditService, AuditStorage, AuditWorker};
use crate::conversion::ConversionEngine;
use crate::core::Config;
use crate::db::DbService;

/// Server state - shared handles for every service
///
/// Cheap to clone (`Arc` and pool handles all the way down); axum clones
/// it per request.
///
/// | Field | Description |
/// |-------|-------------|
/// | config | immutable configuration |
/// | pool | SQLite connection pool |
/// | audit_service | append-only audit trail |
/// | conversion | enquiry-to-client conversion engine |
#[derive(Clone, Debug)]
pub struct ServerState {
    /// Server configuration
    pub config: Config,
    /// SQLite connection pool
    pub pool: sqlx::SqlitePool,
    /// Audit trail service
    pub audit_service: Arc<AuditService>,
    /// Conversion engine
    pub conversion: ConversionEngine,
    /// Receiver half for the audit worker, consumed by
    /// `start_background_tasks`
    audit_rx: Arc<Mutex<Option<mpsc::Receiver<AuditLogRequest>>>>,
}

impl ServerState {
    /// Initialize the server state: work dir, database, services.
    ///
    /// # Panics
    ///
    /// Panics when the work directory or database cannot be initialized;
    /// there is nothing useful to serve without them.
    pub async fn initialize(config: &Config) -> Self {
        // 0. Ensure work_dir structure exists
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        // 1. Initialize DB at work_dir/database/crm.db
        let db_path = config.database_dir().join("crm.db");
        let db_service = DbService::new(&db_path.to_string_lossy())
            .await
            .expect("Failed to initialize database");
        let pool = db_service.pool;

        // 2. Services
        let storage = AuditStorage::new(pool.clone());
        let (audit_service, audit_rx) = AuditService::new(
            storage,
            config.audit_buffer_size,
            config.enable_audit_log,
        );
        let conversion = ConversionEngine::new(pool.clone());

        Self {
            config: config.clone(),
            pool,
            audit_service,
            conversion,
            audit_rx: Arc::new(Mutex::new(Some(audit_rx))),
        }
    }

    /// Start background tasks. Must be called before `Server::run()`
    /// serves traffic; calling it twice is a no-op.
    pub fn start_background_tasks(&self) {
        let rx = self
            .audit_rx
            .lock()
            .expect("audit receiver lock poisoned")
            .take();
        if let Some(rx) = rx {
            let worker = AuditWorker::new(self.audit_service.storage().clone());
            tokio::spawn(worker.run(rx));
        }
    }
}
