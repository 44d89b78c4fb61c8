use anyhow::Context;

use discoverly_api::app::{AppOptions, build_app, services::build_services};
use discoverly_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    discoverly_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = build_services(&config).await?;
    let app = build_app(services, AppOptions::from(&config));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
