//! Infrastructure layer: stores, configuration and the marketplace services.

pub mod access;
pub mod config;
pub mod coupons;
pub mod engagement;
pub mod error;
pub mod lifecycle;
pub mod marketplace;
pub mod moderation;
pub mod payments;
pub mod store;

#[cfg(test)]
mod testing;

pub use access::AccessControl;
pub use config::{AppConfig, ConfigError};
pub use coupons::CouponBook;
pub use engagement::EngagementLedger;
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use lifecycle::ProductLifecycle;
pub use marketplace::Marketplace;
pub use moderation::{ModerationQueue, SiteStats};
pub use payments::{DevPaymentProvider, PaymentError, PaymentIntent, PaymentProvider, Payments};
pub use store::{InMemoryStore, MarketplaceStore, PostgresStore, StoreError, StoreHandle};
