//! Moderation queue and public listings.

use serde::Serialize;
use tracing::instrument;

use discoverly_auth::{Gate, Principal, Role};
use discoverly_catalog::moderation::{self, Page, PageRequest};
use discoverly_catalog::{Product, ProductFilter, ProductQuery, ProductStatus};

use crate::error::ServiceResult;
use crate::store::StoreHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStats {
    pub users: u64,
    pub reviews: u64,
    pub pending_products: u64,
    pub accepted_products: u64,
    pub rejected_products: u64,
}

#[derive(Debug, Clone)]
pub struct ModerationQueue {
    store: StoreHandle,
}

impl ModerationQueue {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Every product, untriaged first.
    pub async fn list_for_review(&self, principal: &Principal) -> ServiceResult<Vec<Product>> {
        Gate::role(Role::Moderator).check(principal)?;
        self.run(&moderation::review_queue()).await
    }

    pub async fn featured(&self) -> ServiceResult<Vec<Product>> {
        self.run(&moderation::featured()).await
    }

    pub async fn trending(&self) -> ServiceResult<Vec<Product>> {
        self.run(&moderation::trending()).await
    }

    #[instrument(skip(self), fields(page = request.page, page_size = request.page_size), err)]
    pub async fn accepted(&self, tag: Option<&str>, request: PageRequest) -> ServiceResult<Page<Product>> {
        let filter = moderation::accepted_filter(tag);
        let total = self
            .store
            .run("count_products", self.store.get().count_products(&filter))
            .await?;
        let items = self.run(&moderation::accepted_page(tag, request)).await?;
        Ok(Page::new(items, total, request))
    }

    pub async fn stats(&self, principal: &Principal) -> ServiceResult<SiteStats> {
        Gate::role(Role::Admin).check(principal)?;
        let store = self.store.get();
        let users = self.store.run("count_users", store.count_users()).await?;
        let reviews = self.store.run("count_reviews", store.count_reviews()).await?;
        let by_status = |status| ProductFilter::with_status(status);

        Ok(SiteStats {
            users,
            reviews,
            pending_products: self
                .store
                .run("count_products", store.count_products(&by_status(ProductStatus::Pending)))
                .await?,
            accepted_products: self
                .store
                .run("count_products", store.count_products(&by_status(ProductStatus::Accepted)))
                .await?,
            rejected_products: self
                .store
                .run("count_products", store.count_products(&by_status(ProductStatus::Rejected)))
                .await?,
        })
    }

    async fn run(&self, query: &ProductQuery) -> ServiceResult<Vec<Product>> {
        Ok(self
            .store
            .run("find_products", self.store.get().find_products(query))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{Fixture, draft};
    use discoverly_catalog::{ModerationPatch, ProductDraft};

    #[tokio::test]
    async fn review_queue_is_moderator_only_and_ranked() {
        let fx = Fixture::new();
        let owner = fx.subscribe("owner@x.io").await;
        let moderator = fx.user_with_role("mod@x.io", Role::Moderator).await;

        let first = fx.lifecycle.submit(&owner, draft("first")).await.unwrap();
        let _second = fx.lifecycle.submit(&owner, draft("second")).await.unwrap();
        fx.accept(&moderator, first.id).await;

        let err = fx.queue.list_for_review(&owner).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let queue = fx.queue.list_for_review(&moderator).await.unwrap();
        let names: Vec<&str> = queue.iter().map(|p| p.product_name.as_str()).collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn featured_listing_needs_acceptance() {
        let fx = Fixture::new();
        let owner = fx.subscribe("owner@x.io").await;
        let moderator = fx.user_with_role("mod@x.io", Role::Moderator).await;
        let p = fx.lifecycle.submit(&owner, draft("promo")).await.unwrap();

        let feature = ModerationPatch {
            is_featured: Some(true),
            ..ModerationPatch::default()
        };
        fx.lifecycle.set_moderation_flags(&moderator, p.id, feature).await.unwrap();
        assert!(fx.queue.featured().await.unwrap().is_empty());

        fx.accept(&moderator, p.id).await;
        assert_eq!(fx.queue.featured().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn accepted_pages_carry_totals() {
        let fx = Fixture::new();
        let owner = fx.subscribe("owner@x.io").await;
        let moderator = fx.user_with_role("mod@x.io", Role::Moderator).await;
        for n in 0..15 {
            let p = fx
                .lifecycle
                .submit(
                    &owner,
                    ProductDraft {
                        tags: vec!["ai".to_string()],
                        ..draft(&format!("p{n}"))
                    },
                )
                .await
                .unwrap();
            fx.accept(&moderator, p.id).await;
        }
        fx.lifecycle.submit(&owner, draft("unreviewed")).await.unwrap();

        let page = fx
            .queue
            .accepted(Some("AI"), PageRequest::new(Some(2), Some(6)).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total_count, 15);
        assert_eq!(page.total_pages, 3);
        let names: Vec<&str> = page.items.iter().map(|p| p.product_name.as_str()).collect();
        assert_eq!(names, vec!["p8", "p7", "p6", "p5", "p4", "p3"]);

        let beyond = fx
            .queue
            .accepted(None, PageRequest::new(Some(10), None).unwrap())
            .await
            .unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_count, 15);
    }

    #[tokio::test]
    async fn stats_are_admin_only() {
        let fx = Fixture::new();
        let owner = fx.user_with_role("owner@x.io", Role::Member).await;
        let admin = fx.user_with_role("root@x.io", Role::Admin).await;
        fx.lifecycle.submit(&owner, draft("p")).await.unwrap();

        assert_eq!(
            fx.queue.stats(&owner).await.unwrap_err().kind(),
            ErrorKind::Forbidden
        );
        let stats = fx.queue.stats(&admin).await.unwrap();
        assert_eq!(stats.users, 2);
        assert_eq!(stats.pending_products, 1);
        assert_eq!(stats.accepted_products + stats.rejected_products, 0);
    }
}
