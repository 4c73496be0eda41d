mod api;
mod config;

use std::sync::Arc;

use anyhow::Context;
use drive_hub::DriveHub;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    info!("starting remote drive server");
    let config_path =
        std::env::var("DRIVE_HUB_CONFIG").unwrap_or_else(|_| "drives.toml".to_string());
    info!(path = %config_path, "loading server config");
    let config = ServerConfig::load(&config_path)
        .with_context(|| format!("failed to load server config from {config_path}"))?;

    if config.hub.local_roots.is_empty() {
        warn!("no local roots configured");
    } else {
        for root in &config.hub.local_roots {
            info!(
                name = %root.name,
                path = %root.path.display(),
                read_only = root.read_only,
                "local root available"
            );
        }
    }

    let bind = config.server.bind.clone();
    let hub = Arc::new(DriveHub::new(config.hub).context("failed to initialize drive hub")?);

    let mut event_stream = hub.subscribe_events();
    info!("subscribed to drive hub event stream");
    tokio::spawn(async move {
        loop {
            match event_stream.recv().await {
                Ok(event) => info!(?event, "drive hub event"),
                Err(err) => {
                    warn!(error = %err, "failed to receive drive hub event");
                    break;
                }
            }
        }
    });

    let app = api::create_drive_router()
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(AppState::new(hub)));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(bind = %bind, "server is ready, press Ctrl+C to shut down");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received, stopping server");
        })
        .await
        .context("server terminated with an error")?;

    info!("server shutdown complete");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}
