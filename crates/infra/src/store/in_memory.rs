use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use discoverly_auth::{Role, User};
use discoverly_catalog::{
    Coupon, ModerationChange, Product, ProductFilter, ProductQuery, ProductStatus, Report, Review,
    SubmissionQuota,
};
use discoverly_core::{CouponId, Email, Entity, ProductId, ReportId};

use super::{
    CouponWrite, MarketplaceStore, ModerationWrite, QuotaOutcome, StoreError, VoteOutcome,
};

/// One lock-guarded collection keyed by entity id.
///
/// Guards are only held inside synchronous sections; nothing awaits while a
/// lock is taken.
#[derive(Debug)]
struct Collection<E: Entity> {
    inner: RwLock<HashMap<E::Id, E>>,
}

impl<E: Entity> Collection<E> {
    fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<E::Id, E>>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory collection lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<E::Id, E>>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory collection lock poisoned".to_string()))
    }
}

impl<E: Entity + Clone> Collection<E> {
    fn get(&self, id: &E::Id) -> Result<Option<E>, StoreError> {
        Ok(self.read()?.get(id).cloned())
    }

    fn remove(&self, id: &E::Id) -> Result<bool, StoreError> {
        Ok(self.write()?.remove(id).is_some())
    }

    fn values(&self) -> Result<Vec<E>, StoreError> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn len(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.len() as u64)
    }

    /// Mutate one record in place under the write lock.
    fn update<T>(&self, id: &E::Id, f: impl FnOnce(&mut E) -> T) -> Result<Option<T>, StoreError> {
        let mut map = self.write()?;
        Ok(map.get_mut(id).map(f))
    }
}

/// Process-local store for development and tests.
#[derive(Debug)]
pub struct InMemoryStore {
    users: Collection<User>,
    products: Collection<Product>,
    reports: Collection<Report>,
    reviews: Collection<Review>,
    coupons: Collection<Coupon>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: Collection::new(),
            products: Collection::new(),
            reports: Collection::new(),
            reviews: Collection::new(),
            coupons: Collection::new(),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketplaceStore for InMemoryStore {
    async fn insert_user_if_absent(&self, user: User) -> Result<bool, StoreError> {
        let mut users = self.users.write()?;
        if users.contains_key(&user.email) {
            return Ok(false);
        }
        users.insert(user.email.clone(), user);
        Ok(true)
    }

    async fn find_user(&self, email: &Email) -> Result<Option<User>, StoreError> {
        self.users.get(email)
    }

    async fn list_users_except(&self, exclude: &Email) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .users
            .read()?
            .values()
            .filter(|u| &u.email != exclude)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.email.cmp(&b.email)));
        Ok(users)
    }

    async fn set_user_role(&self, email: &Email, role: Role) -> Result<Option<User>, StoreError> {
        self.users.update(email, |u| {
            u.role = role;
            u.clone()
        })
    }

    async fn set_user_subscribed(&self, email: &Email) -> Result<Option<User>, StoreError> {
        self.users.update(email, |u| {
            u.is_subscribed = true;
            u.clone()
        })
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        self.users.len()
    }

    async fn insert_product_within_quota(
        &self,
        product: Product,
        quota: SubmissionQuota,
    ) -> Result<QuotaOutcome, StoreError> {
        // Count and insert under one write guard so concurrent submissions by
        // the same owner serialize.
        let mut products = self.products.write()?;
        let owned = products
            .values()
            .filter(|p| p.owner_email == product.owner_email)
            .count() as u64;
        if !quota.allows(owned) {
            return Ok(QuotaOutcome::Exceeded);
        }
        products.insert(product.id, product);
        Ok(QuotaOutcome::Inserted)
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.products.get(&id)
    }

    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read()?;
        Ok(query.run(products.values()))
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let products = self.products.read()?;
        Ok(products.values().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn write_product_details(&self, product: &Product) -> Result<bool, StoreError> {
        let written = self.products.update(&product.id, |stored| {
            stored.product_name = product.product_name.clone();
            stored.description = product.description.clone();
            stored.link = product.link.clone();
            stored.image = product.image.clone();
            stored.tags = product.tags.clone();
        })?;
        Ok(written.is_some())
    }

    async fn apply_moderation(
        &self,
        id: ProductId,
        expected: ProductStatus,
        change: &ModerationChange,
    ) -> Result<ModerationWrite, StoreError> {
        let outcome = self.products.update(&id, |stored| {
            if stored.status != expected {
                return ModerationWrite::Stale;
            }
            stored.apply_moderation(change);
            ModerationWrite::Applied(stored.clone())
        })?;
        Ok(outcome.unwrap_or(ModerationWrite::NotFound))
    }

    async fn add_vote(&self, id: ProductId, voter: &Email) -> Result<VoteOutcome, StoreError> {
        let outcome = self.products.update(&id, |stored| {
            if stored.add_vote(voter) {
                VoteOutcome::Recorded(stored.clone())
            } else {
                VoteOutcome::AlreadyVoted
            }
        })?;
        Ok(outcome.unwrap_or(VoteOutcome::NotFound))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        self.products.remove(&id)
    }

    async fn insert_report_unique(&self, report: Report) -> Result<bool, StoreError> {
        let mut reports = self.reports.write()?;
        let duplicate = reports
            .values()
            .any(|r| r.product_id == report.product_id && r.user_email == report.user_email);
        if duplicate {
            return Ok(false);
        }
        reports.insert(report.id, report);
        Ok(true)
    }

    async fn list_reports(&self) -> Result<Vec<Report>, StoreError> {
        let mut reports = self.reports.values()?;
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    async fn delete_report(&self, id: ReportId) -> Result<bool, StoreError> {
        self.reports.remove(&id)
    }

    async fn insert_review(&self, review: Review) -> Result<(), StoreError> {
        self.reviews.write()?.insert(review.id, review);
        Ok(())
    }

    async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>, StoreError> {
        let mut reviews: Vec<Review> = self
            .reviews
            .read()?
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| review_key(b).cmp(&review_key(a)))
        });
        Ok(reviews)
    }

    async fn count_reviews(&self) -> Result<u64, StoreError> {
        self.reviews.len()
    }

    async fn insert_coupon(&self, coupon: Coupon) -> Result<bool, StoreError> {
        let mut coupons = self.coupons.write()?;
        if coupons.values().any(|c| c.code == coupon.code) {
            return Ok(false);
        }
        coupons.insert(coupon.id, coupon);
        Ok(true)
    }

    async fn find_coupon(&self, id: CouponId) -> Result<Option<Coupon>, StoreError> {
        self.coupons.get(&id)
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>, StoreError> {
        let mut coupons = self.coupons.values()?;
        coupons.sort_by(|a, b| a.expiry.cmp(&b.expiry).then_with(|| a.code.cmp(&b.code)));
        Ok(coupons)
    }

    async fn replace_coupon(&self, coupon: &Coupon) -> Result<CouponWrite, StoreError> {
        let mut coupons = self.coupons.write()?;
        if !coupons.contains_key(&coupon.id) {
            return Ok(CouponWrite::NotFound);
        }
        if coupons
            .values()
            .any(|c| c.id != coupon.id && c.code == coupon.code)
        {
            return Ok(CouponWrite::CodeTaken);
        }
        coupons.insert(coupon.id, coupon.clone());
        Ok(CouponWrite::Written)
    }

    async fn delete_coupon(&self, id: CouponId) -> Result<bool, StoreError> {
        self.coupons.remove(&id)
    }
}

fn review_key(review: &Review) -> uuid::Uuid {
    *review.id.as_uuid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use discoverly_auth::NewUser;
    use discoverly_catalog::ProductDraft;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn product(owner: &str) -> Product {
        Product::submit(
            ProductId::new(),
            email(owner),
            ProductDraft {
                product_name: "Widget".to_string(),
                link: "https://widget.dev".to_string(),
                ..ProductDraft::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn user_insert_is_idempotent() {
        let store = InMemoryStore::new();
        let user = User::register(
            NewUser {
                email: "a@x.io".to_string(),
                name: None,
                photo_url: None,
            },
            Utc::now(),
        )
        .unwrap();
        assert!(store.insert_user_if_absent(user.clone()).await.unwrap());
        assert!(!store.insert_user_if_absent(user).await.unwrap());
        assert_eq!(store.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn quota_counts_products_of_any_status() {
        let store = InMemoryStore::new();
        let quota = SubmissionQuota::for_owner(false);
        assert_eq!(
            store.insert_product_within_quota(product("a@x.io"), quota).await.unwrap(),
            QuotaOutcome::Inserted
        );
        assert_eq!(
            store.insert_product_within_quota(product("a@x.io"), quota).await.unwrap(),
            QuotaOutcome::Exceeded
        );
        assert_eq!(
            store.insert_product_within_quota(product("b@x.io"), quota).await.unwrap(),
            QuotaOutcome::Inserted
        );
    }

    #[tokio::test]
    async fn moderation_is_compare_and_set() {
        let store = InMemoryStore::new();
        let p = product("a@x.io");
        let id = p.id;
        store
            .insert_product_within_quota(p, SubmissionQuota::for_owner(true))
            .await
            .unwrap();

        let accept = ModerationChange {
            status: Some(ProductStatus::Accepted),
            is_featured: None,
        };
        let stale = store
            .apply_moderation(id, ProductStatus::Rejected, &accept)
            .await
            .unwrap();
        assert_eq!(stale, ModerationWrite::Stale);

        match store.apply_moderation(id, ProductStatus::Pending, &accept).await.unwrap() {
            ModerationWrite::Applied(p) => assert!(p.is_accepted && !p.is_rejected),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(
            store
                .apply_moderation(ProductId::new(), ProductStatus::Pending, &accept)
                .await
                .unwrap(),
            ModerationWrite::NotFound
        );
    }

    #[tokio::test]
    async fn duplicate_report_is_rejected() {
        let store = InMemoryStore::new();
        let product_id = ProductId::new();
        let file = || {
            Report::file(
                ReportId::new(),
                product_id,
                email("r@x.io"),
                discoverly_catalog::NewReport {
                    body: "spam".to_string(),
                },
                Utc::now(),
            )
            .unwrap()
        };
        assert!(store.insert_report_unique(file()).await.unwrap());
        assert!(!store.insert_report_unique(file()).await.unwrap());
        assert_eq!(store.list_reports().await.unwrap().len(), 1);
    }
}
