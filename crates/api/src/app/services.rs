//! Service wiring for the HTTP layer.

use std::sync::Arc;

use discoverly_infra::{AppConfig, Marketplace};

pub type AppServices = Marketplace;

/// Build every service from configuration and promote configured admins.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<Arc<AppServices>> {
    if config.jwt_secret_is_default {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }
    let services = Marketplace::from_config(config).await?;
    services.bootstrap(config).await?;
    Ok(Arc::new(services))
}
