//! Marketplace persistence capability.
//!
//! Services never touch a concrete database. They receive a [`StoreHandle`]
//! wrapping any [`MarketplaceStore`], so tests run against [`InMemoryStore`]
//! and deployments against [`PostgresStore`] with identical semantics.
//!
//! Every operation that enforces an "at most once" or "at most N" rule is a
//! single conditional primitive here (quota insert, vote append, unique report,
//! status compare-and-set). Services must not emulate them with a read followed
//! by a write.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use discoverly_auth::{Role, User};
use discoverly_catalog::{
    Coupon, ModerationChange, Product, ProductFilter, ProductQuery, ProductStatus, Report, Review,
    SubmissionQuota,
};
use discoverly_core::{CouponId, Email, ProductId, ReportId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store operation '{0}' timed out")]
    Timeout(&'static str),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store backend error: {0}")]
    Backend(String),

    /// A persisted record could not be decoded into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaOutcome {
    Inserted,
    Exceeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded(Product),
    AlreadyVoted,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationWrite {
    Applied(Product),
    NotFound,
    /// The product's status no longer matched the expected one.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CouponWrite {
    Written,
    NotFound,
    CodeTaken,
}

#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    // users
    /// Insert unless a user with the same email exists; returns whether inserted.
    async fn insert_user_if_absent(&self, user: User) -> Result<bool, StoreError>;
    async fn find_user(&self, email: &Email) -> Result<Option<User>, StoreError>;
    async fn list_users_except(&self, exclude: &Email) -> Result<Vec<User>, StoreError>;
    async fn set_user_role(&self, email: &Email, role: Role) -> Result<Option<User>, StoreError>;
    async fn set_user_subscribed(&self, email: &Email) -> Result<Option<User>, StoreError>;
    async fn count_users(&self) -> Result<u64, StoreError>;

    // products
    /// Count the owner's products and insert atomically with respect to other
    /// submissions by the same owner.
    async fn insert_product_within_quota(
        &self,
        product: Product,
        quota: SubmissionQuota,
    ) -> Result<QuotaOutcome, StoreError>;
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError>;
    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError>;
    /// Overwrite the editable detail columns only; returns whether the row exists.
    async fn write_product_details(&self, product: &Product) -> Result<bool, StoreError>;
    /// Apply `change` only if the stored status still equals `expected`.
    async fn apply_moderation(
        &self,
        id: ProductId,
        expected: ProductStatus,
        change: &ModerationChange,
    ) -> Result<ModerationWrite, StoreError>;
    async fn add_vote(&self, id: ProductId, voter: &Email) -> Result<VoteOutcome, StoreError>;
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError>;

    // reports
    /// Insert unless `(product_id, user_email)` already reported; returns whether inserted.
    async fn insert_report_unique(&self, report: Report) -> Result<bool, StoreError>;
    async fn list_reports(&self) -> Result<Vec<Report>, StoreError>;
    async fn delete_report(&self, id: ReportId) -> Result<bool, StoreError>;

    // reviews
    async fn insert_review(&self, review: Review) -> Result<(), StoreError>;
    async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>, StoreError>;
    async fn count_reviews(&self) -> Result<u64, StoreError>;

    // coupons
    /// Returns `false` when the code is already taken.
    async fn insert_coupon(&self, coupon: Coupon) -> Result<bool, StoreError>;
    async fn find_coupon(&self, id: CouponId) -> Result<Option<Coupon>, StoreError>;
    async fn list_coupons(&self) -> Result<Vec<Coupon>, StoreError>;
    async fn replace_coupon(&self, coupon: &Coupon) -> Result<CouponWrite, StoreError>;
    async fn delete_coupon(&self, id: CouponId) -> Result<bool, StoreError>;
}

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared store capability plus the per-call deadline.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn MarketplaceStore>,
    timeout: Duration,
}

impl StoreHandle {
    pub fn new(store: Arc<dyn MarketplaceStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()), DEFAULT_STORE_TIMEOUT)
    }

    pub fn get(&self) -> &dyn MarketplaceStore {
        self.store.as_ref()
    }

    /// Run one store call under the configured deadline.
    pub async fn run<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => {
                if let Err(err) = &result {
                    tracing::warn!(operation, error = %err, "store call failed");
                }
                result
            }
            Err(_) => {
                tracing::warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "store call timed out");
                Err(StoreError::Timeout(operation))
            }
        }
    }
}

impl core::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
