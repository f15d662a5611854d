//! Vehicle Counter - stable count poller and REST API
//!
//! Main entry point.

use axum::http::Method;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vehicle_counter::{
    polling_orchestrator::PollingOrchestrator,
    raw_source_client::RawSourceClient,
    state::{AppConfig, AppState},
    vehicle_log_service::VehicleLogService,
    web_api,
};

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vehicle_counter=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting vehicle counter v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        database_file = %config.database_file.display(),
        raw_source_url = %config.raw_source_url,
        poll_interval_ms = config.poll_interval_ms,
        stable_threshold = config.stable_threshold,
        camera_id = config.camera_id,
        fetch_timeout_ms = config.fetch_timeout_ms,
        poller_enabled = config.poller_enabled,
        "Configuration loaded"
    );

    // Storage is required by everything else; failure here aborts startup
    let pool = VehicleLogService::connect(&config.database_file).await?;
    let vehicle_logs = Arc::new(VehicleLogService::new(pool));
    vehicle_logs.init_schema().await?;
    tracing::info!("Database initialized");

    let polling = if config.poller_enabled {
        let source = RawSourceClient::new(config.raw_source_url.clone(), config.fetch_timeout())?;
        let polling = Arc::new(PollingOrchestrator::new(
            source,
            vehicle_logs.clone(),
            config.poller_config(),
        ));
        polling.start().await;
        Some(polling)
    } else {
        tracing::info!("Poller disabled (POLLER_ENABLED=false)");
        None
    };

    let state = AppState {
        config: config.clone(),
        vehicle_logs,
        polling: polling.clone(),
        started_at: Instant::now(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let app = web_api::create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(polling) = polling {
        polling.stop();
        polling.join().await;
    }

    tracing::info!("Vehicle counter stopped");

    Ok(())
}
