use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use claimwatch::config::Config;
use claimwatch::pipeline::ClaimPipeline;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=info for output)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("ClaimWatch starting");

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    tracing::info!(
        custom_rules = config.scoring.rules.len(),
        "Configuration loaded from {}",
        config_path
    );

    // Rule table, store and analytics seed; a malformed rule table stops startup here
    let pipeline = Arc::new(ClaimPipeline::init(&config).await?);

    if !config.api.enabled {
        tracing::warn!("API disabled in configuration, nothing to serve");
        return Ok(());
    }

    let shutdown = CancellationToken::new();

    let server = {
        let pipeline = pipeline.clone();
        let shutdown = shutdown.clone();
        let host = config.api.host.clone();
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = claimwatch::api::serve(pipeline, &host, port, shutdown).await {
                tracing::error!(error = %e, "API server failed");
            }
        })
    };

    tracing::info!("ClaimWatch ready. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, draining API server...");
    shutdown.cancel();
    let _ = server.await;

    let snapshot = pipeline.analytics().await;
    tracing::info!(
        total_claims = snapshot.total_claims,
        fraudulent_claims = snapshot.fraudulent_claims,
        "ClaimWatch stopped gracefully"
    );
    Ok(())
}
