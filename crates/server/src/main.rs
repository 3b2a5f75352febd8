use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timeshift_core::{
    load_config, validate_config, BatchOrchestrator, BatchSession, GeminiImageService,
    GenerationBackend, GenerationService,
};
use timeshift_server::api::create_router;
use timeshift_server::metrics::task_update_callback;
use timeshift_server::state::AppState;

/// Buffer size for session events fanned out to WebSocket clients
const SESSION_EVENT_BUFFER: usize = 256;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("TIMESHIFT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!(
        "{} shifts configured: {}",
        config.shifts.len(),
        config
            .shifts
            .iter()
            .map(|p| p.label.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    match config.orchestrator.task_timeout() {
        Some(limit) => info!("Per-task timeout: {:?}", limit),
        None => info!("No per-task timeout configured"),
    }

    // Create generation service
    let service: Arc<dyn GenerationService> = match config.generation.backend {
        GenerationBackend::Gemini => {
            if config.generation.api_key.is_none() {
                warn!("No generation API key configured; every task will fail until one is set");
            }
            info!("Initializing Gemini image service ({})", config.generation.model);
            Arc::new(
                GeminiImageService::new(config.generation.clone())
                    .context("Failed to create generation service")?,
            )
        }
    };

    // Create orchestrator and the session it feeds
    let orchestrator = Arc::new(
        BatchOrchestrator::new(config.orchestrator.clone(), service)
            .with_update_callback(task_update_callback()),
    );
    let session = Arc::new(BatchSession::new(SESSION_EVENT_BUFFER));

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&orchestrator),
        session,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let status = orchestrator.status();
    if status.tasks_in_flight > 0 {
        warn!(
            "Shutting down with {} generation tasks still in flight",
            status.tasks_in_flight
        );
    }
    info!("Server stopped after {} batches", status.batches_started);

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
