//! Shared fixtures for service tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use discoverly_auth::{Hs256JwtIssuer, JwtIssuer, NewUser, Principal, Role, User};
use discoverly_catalog::{
    Coupon, ModerationChange, ModerationPatch, Product, ProductDraft, ProductFilter, ProductQuery,
    ProductStatus, Report, Review, SubmissionQuota,
};
use discoverly_core::{CouponId, Email, ProductId, ReportId};

use crate::marketplace::Marketplace;
use crate::store::{
    CouponWrite, DEFAULT_STORE_TIMEOUT, InMemoryStore, MarketplaceStore, ModerationWrite,
    QuotaOutcome, StoreError, StoreHandle, VoteOutcome,
};

pub const SECRET: &str = "test-secret";

pub fn member(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        name: Some("Test User".to_string()),
        photo_url: None,
    }
}

pub fn draft(name: &str) -> ProductDraft {
    ProductDraft {
        product_name: name.to_string(),
        description: format!("{name} does things"),
        link: format!("https://{}.example.com", name.replace(' ', "-")),
        ..ProductDraft::default()
    }
}

pub struct Fixture {
    pub store: StoreHandle,
    pub services: Marketplace,
}

impl core::ops::Deref for Fixture {
    type Target = Marketplace;

    fn deref(&self) -> &Marketplace {
        &self.services
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_store(StoreHandle::in_memory())
    }

    pub fn with_store(store: StoreHandle) -> Self {
        Self {
            services: Marketplace::with_secret(store.clone(), SECRET, Duration::days(1)),
            store,
        }
    }

    /// Register `email` with the given role and return its current principal.
    pub async fn user_with_role(&self, email: &str, role: Role) -> Principal {
        self.access.register(member(email)).await.unwrap();
        let email = Email::parse(email).unwrap();
        self.store.get().set_user_role(&email, role).await.unwrap();
        self.principal(email.as_str()).await
    }

    /// Register (if needed) and subscribe a member.
    pub async fn subscribe(&self, email: &str) -> Principal {
        self.access.register(member(email)).await.unwrap();
        let parsed = Email::parse(email).unwrap();
        self.store.get().set_user_subscribed(&parsed).await.unwrap();
        self.principal(email).await
    }

    pub async fn principal(&self, email: &str) -> Principal {
        let token = self.access.issue_token(email).await.unwrap();
        self.access.authenticate(Some(&token)).await.unwrap()
    }

    /// A valid credential for an email that was never registered.
    pub fn token_for_unregistered(&self, email: &str) -> String {
        Hs256JwtIssuer::new(SECRET, Duration::days(1))
            .issue(&Email::parse(email).unwrap(), Utc::now())
            .unwrap()
    }

    pub async fn accept(&self, moderator: &Principal, id: ProductId) {
        self.lifecycle
            .set_moderation_flags(
                moderator,
                id,
                ModerationPatch {
                    status: Some(ProductStatus::Accepted),
                    ..ModerationPatch::default()
                },
            )
            .await
            .unwrap();
    }
}

/// In-memory store whose status compare-and-set always loses, as if another
/// moderator kept winning the race.
#[derive(Default)]
pub struct ContendedStore {
    inner: InMemoryStore,
    pub moderation_attempts: AtomicUsize,
}

impl ContendedStore {
    pub fn handle(self: &Arc<Self>) -> StoreHandle {
        StoreHandle::new(self.clone(), DEFAULT_STORE_TIMEOUT)
    }

    pub fn attempts(&self) -> usize {
        self.moderation_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketplaceStore for ContendedStore {
    async fn insert_user_if_absent(&self, user: User) -> Result<bool, StoreError> {
        self.inner.insert_user_if_absent(user).await
    }
    async fn find_user(&self, email: &Email) -> Result<Option<User>, StoreError> {
        self.inner.find_user(email).await
    }
    async fn list_users_except(&self, exclude: &Email) -> Result<Vec<User>, StoreError> {
        self.inner.list_users_except(exclude).await
    }
    async fn set_user_role(&self, email: &Email, role: Role) -> Result<Option<User>, StoreError> {
        self.inner.set_user_role(email, role).await
    }
    async fn set_user_subscribed(&self, email: &Email) -> Result<Option<User>, StoreError> {
        self.inner.set_user_subscribed(email).await
    }
    async fn count_users(&self) -> Result<u64, StoreError> {
        self.inner.count_users().await
    }
    async fn insert_product_within_quota(
        &self,
        product: Product,
        quota: SubmissionQuota,
    ) -> Result<QuotaOutcome, StoreError> {
        self.inner.insert_product_within_quota(product, quota).await
    }
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.inner.find_product(id).await
    }
    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        self.inner.find_products(query).await
    }
    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        self.inner.count_products(filter).await
    }
    async fn write_product_details(&self, product: &Product) -> Result<bool, StoreError> {
        self.inner.write_product_details(product).await
    }
    async fn apply_moderation(
        &self,
        _id: ProductId,
        _expected: ProductStatus,
        _change: &ModerationChange,
    ) -> Result<ModerationWrite, StoreError> {
        self.moderation_attempts.fetch_add(1, Ordering::SeqCst);
        Ok(ModerationWrite::Stale)
    }
    async fn add_vote(&self, id: ProductId, voter: &Email) -> Result<VoteOutcome, StoreError> {
        self.inner.add_vote(id, voter).await
    }
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        self.inner.delete_product(id).await
    }
    async fn insert_report_unique(&self, report: Report) -> Result<bool, StoreError> {
        self.inner.insert_report_unique(report).await
    }
    async fn list_reports(&self) -> Result<Vec<Report>, StoreError> {
        self.inner.list_reports().await
    }
    async fn delete_report(&self, id: ReportId) -> Result<bool, StoreError> {
        self.inner.delete_report(id).await
    }
    async fn insert_review(&self, review: Review) -> Result<(), StoreError> {
        self.inner.insert_review(review).await
    }
    async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>, StoreError> {
        self.inner.list_reviews(product_id).await
    }
    async fn count_reviews(&self) -> Result<u64, StoreError> {
        self.inner.count_reviews().await
    }
    async fn insert_coupon(&self, coupon: Coupon) -> Result<bool, StoreError> {
        self.inner.insert_coupon(coupon).await
    }
    async fn find_coupon(&self, id: CouponId) -> Result<Option<Coupon>, StoreError> {
        self.inner.find_coupon(id).await
    }
    async fn list_coupons(&self) -> Result<Vec<Coupon>, StoreError> {
        self.inner.list_coupons().await
    }
    async fn replace_coupon(&self, coupon: &Coupon) -> Result<CouponWrite, StoreError> {
        self.inner.replace_coupon(coupon).await
    }
    async fn delete_coupon(&self, id: CouponId) -> Result<bool, StoreError> {
        self.inner.delete_coupon(id).await
    }
}
