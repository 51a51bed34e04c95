use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use service_skeleton::api::handlers::AppStateInner;
use service_skeleton::api::routes::create_router;
use service_skeleton::config::Config;
use service_skeleton::logger::{self, StructuredLogger, TracingSink};

/// Wait for shutdown signal (SIGTERM or SIGINT)
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
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Starting graceful shutdown...");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first: the log format depends on the environment
    let config = Config::from_env().context("Failed to load configuration")?;

    logger::init_tracing(config.app.environment);

    info!(
        "Starting {} v{} ({})",
        config.app.name,
        env!("CARGO_PKG_VERSION"),
        config.app.environment
    );

    let structured_logger = StructuredLogger::new(&config, Arc::new(TracingSink));
    let addr = config.server_address();

    let state = Arc::new(
        AppStateInner::new(config, structured_logger).context("Invalid error registry")?,
    );
    info!("Error registry validated ({} definitions)", state.registry.len());

    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind server")?;

    info!("Server listening on {}", addr);

    // Serve with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");

    Ok(())
}
