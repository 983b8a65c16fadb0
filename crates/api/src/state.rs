use std::sync::Arc;

use songreel_worker::JobOrchestrator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Job lifecycle service (submit, status, cancel, subscribe).
    pub orchestrator: Arc<JobOrchestrator>,
}
