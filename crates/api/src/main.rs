use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use songreel_api::app::build_app;
use songreel_api::config::ServerConfig;
use songreel_api::state::AppState;
use songreel_pipeline::{RendererConfig, SimulatedRenderer};
use songreel_worker::{EngineConfig, JobOrchestrator};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "songreel_api=debug,songreel_worker=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let engine_config = EngineConfig::from_env();
    let renderer_config = RendererConfig::from_env();
    tracing::info!(
        segment_delay_ms = renderer_config.segment_delay.as_millis() as u64,
        public_base_url = %renderer_config.public_base_url,
        "Loaded renderer configuration",
    );

    // --- Job engine ---
    let executor = Arc::new(SimulatedRenderer::new(renderer_config));
    let orchestrator = JobOrchestrator::start(engine_config, executor);

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        orchestrator: Arc::clone(&orchestrator),
    };
    let app = build_app(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&orchestrator)))
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal, then shut the job engine down.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix). The orchestrator is
/// stopped before the server drains connections so open event streams end
/// instead of holding the shutdown open.
async fn shutdown_signal(orchestrator: Arc<JobOrchestrator>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }

    orchestrator.shutdown().await;
}
