use anyhow::Context;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

mod bootstrap;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = mnema_core::Config::from_env().context("loading configuration")?;
    tracing::info!(?config, "configuration loaded");

    let cancel = CancellationToken::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl-c: {e:#}");
                return;
            }
            tracing::info!("received shutdown signal");
            cancel.cancel();
            let _ = shutdown_tx.send(true);
        });
    }

    let components = bootstrap::build(&config)?;

    // Collection bootstrap needs Qdrant and the embedding API; a failure here
    // is logged rather than fatal so the service can come up before its
    // dependencies and recover on the first sync.
    if let Err(e) = components.index.ensure_ready().await {
        tracing::warn!(error = %e, "vector index not ready at startup");
    }

    let server = mnema_gateway::GatewayServer::new(
        &config.bind_addr,
        config.port,
        components.sync,
        components.query,
        components.index,
        cancel,
        shutdown_rx,
    )
    .with_auth(config.auth_token.clone())
    .with_rate_limit(config.rate_limit_per_minute)
    .with_max_body_size(config.max_body_bytes);

    server.serve().await.context("gateway server")?;
    Ok(())
}
