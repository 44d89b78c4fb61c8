//! Service wiring shared by the HTTP layer and tests.

use std::sync::Arc;

use discoverly_auth::{Hs256JwtIssuer, Hs256JwtValidator, JwtIssuer, JwtValidator};

use crate::access::AccessControl;
use crate::config::AppConfig;
use crate::coupons::CouponBook;
use crate::engagement::EngagementLedger;
use crate::error::ServiceError;
use crate::lifecycle::ProductLifecycle;
use crate::moderation::ModerationQueue;
use crate::payments::{DevPaymentProvider, PaymentProvider, Payments};
use crate::store::{PostgresStore, StoreError, StoreHandle};

/// Every marketplace service, sharing one store handle.
#[derive(Debug, Clone)]
pub struct Marketplace {
    pub access: AccessControl,
    pub lifecycle: ProductLifecycle,
    pub queue: ModerationQueue,
    pub ledger: EngagementLedger,
    pub coupons: CouponBook,
    pub payments: Payments,
}

impl Marketplace {
    pub fn new(
        store: StoreHandle,
        validator: Arc<dyn JwtValidator>,
        issuer: Arc<dyn JwtIssuer>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        let access = AccessControl::new(store.clone(), validator, issuer);
        Self {
            payments: Payments::new(provider, access.clone()),
            access,
            lifecycle: ProductLifecycle::new(store.clone()),
            queue: ModerationQueue::new(store.clone()),
            ledger: EngagementLedger::new(store.clone()),
            coupons: CouponBook::new(store),
        }
    }

    /// HS256 credentials with a shared secret and the offline payment provider.
    pub fn with_secret(store: StoreHandle, secret: &str, token_ttl: chrono::Duration) -> Self {
        Self::new(
            store,
            Arc::new(Hs256JwtValidator::new(secret)),
            Arc::new(Hs256JwtIssuer::new(secret, token_ttl)),
            Arc::new(DevPaymentProvider::new()),
        )
    }

    /// Postgres when `DATABASE_URL` is set (schema applied first), else in-memory.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let store = match &config.database_url {
            Some(url) => {
                let pg = PostgresStore::connect(url, config.db_max_connections).await?;
                pg.migrate().await?;
                tracing::info!("using postgres store");
                StoreHandle::new(Arc::new(pg), config.store_timeout)
            }
            None => {
                tracing::info!("DATABASE_URL not set; using in-memory store");
                StoreHandle::new(
                    Arc::new(crate::store::InMemoryStore::new()),
                    config.store_timeout,
                )
            }
        };
        Ok(Self::with_secret(store, &config.jwt_secret, config.token_ttl))
    }

    /// Promote every configured admin email.
    pub async fn bootstrap(&self, config: &AppConfig) -> Result<(), ServiceError> {
        for email in &config.admin_emails {
            self.access.bootstrap_admin(email).await?;
        }
        Ok(())
    }
}
