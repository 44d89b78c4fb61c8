//! Product lifecycle: submission, details, moderation, deletion.

use chrono::Utc;
use tracing::{info, instrument, warn};

use discoverly_auth::{Gate, Principal, Role};
use discoverly_catalog::{
    DetailsPatch, ModerationPatch, Product, ProductDraft, ProductFilter, ProductQuery, ProductSort,
    SubmissionQuota,
};
use discoverly_core::{Email, ProductId};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{ModerationWrite, QuotaOutcome, StoreHandle};

/// Compare-and-set attempts before a moderation write gives up as transient.
const MODERATION_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct ProductLifecycle {
    store: StoreHandle,
}

impl ProductLifecycle {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Create a pending product owned by the caller, subject to the free quota.
    #[instrument(skip(self, principal, draft), fields(owner = %principal.email), err)]
    pub async fn submit(&self, principal: &Principal, draft: ProductDraft) -> ServiceResult<Product> {
        Gate::authenticated().check(principal)?;
        let product = Product::submit(ProductId::new(), principal.email.clone(), draft, Utc::now())?;
        let quota = SubmissionQuota::for_owner(principal.is_subscribed);

        let outcome = self
            .store
            .run(
                "insert_product_within_quota",
                self.store.get().insert_product_within_quota(product.clone(), quota),
            )
            .await?;
        match outcome {
            QuotaOutcome::Inserted => {
                info!(product_id = %product.id, "product submitted");
                Ok(product)
            }
            QuotaOutcome::Exceeded => {
                warn!(owner = %principal.email, "free submission quota exhausted");
                Err(ServiceError::QuotaExceeded)
            }
        }
    }

    pub async fn get(&self, id: ProductId) -> ServiceResult<Product> {
        self.store
            .run("find_product", self.store.get().find_product(id))
            .await?
            .ok_or(ServiceError::NotFound("product"))
    }

    /// Every product of one owner, newest first.
    pub async fn list_by_owner(&self, principal: &Principal, owner: &str) -> ServiceResult<Vec<Product>> {
        let owner = Email::parse(owner)?;
        Gate::owner_or(&owner, &[Role::Moderator, Role::Admin]).check(principal)?;
        let query = ProductQuery::new(ProductFilter::owned_by(owner), ProductSort::Newest);
        Ok(self
            .store
            .run("find_products", self.store.get().find_products(&query))
            .await?)
    }

    /// Update editable details; moderation state and votes are never touched.
    #[instrument(skip(self, principal, patch), fields(product_id = %id, caller = %principal.email), err)]
    pub async fn edit_details(
        &self,
        principal: &Principal,
        id: ProductId,
        patch: DetailsPatch,
    ) -> ServiceResult<Product> {
        let mut product = self.get(id).await?;
        Gate::owner_or(&product.owner_email, &[Role::Moderator]).check(principal)?;

        if !product.apply_details(&patch)? {
            return Ok(product);
        }
        let written = self
            .store
            .run("write_product_details", self.store.get().write_product_details(&product))
            .await?;
        if !written {
            return Err(ServiceError::NotFound("product"));
        }
        info!("product details updated");
        // Re-read so the response reflects any concurrent moderation or votes.
        self.get(id).await
    }

    /// Patch moderation fields; status and its mirror flags move together.
    #[instrument(skip(self, principal, patch), fields(product_id = %id, moderator = %principal.email), err)]
    pub async fn set_moderation_flags(
        &self,
        principal: &Principal,
        id: ProductId,
        patch: ModerationPatch,
    ) -> ServiceResult<Product> {
        Gate::role(Role::Moderator).check(principal)?;

        for _ in 0..MODERATION_ATTEMPTS {
            let current = self.get(id).await?;
            let change = current.plan_moderation(&patch)?;
            if change.is_empty() {
                return Err(ServiceError::NoOp);
            }

            let write = self
                .store
                .run(
                    "apply_moderation",
                    self.store.get().apply_moderation(id, current.status, &change),
                )
                .await?;
            match write {
                ModerationWrite::Applied(product) => {
                    info!(
                        from = %current.status,
                        to = %product.status,
                        featured = product.is_featured,
                        "moderation applied"
                    );
                    return Ok(product);
                }
                ModerationWrite::NotFound => return Err(ServiceError::NotFound("product")),
                ModerationWrite::Stale => continue,
            }
        }

        warn!("moderation lost every compare-and-set race");
        Err(ServiceError::Transient(
            "product changed concurrently; retry".to_string(),
        ))
    }

    #[instrument(skip(self, principal), fields(product_id = %id, caller = %principal.email), err)]
    pub async fn delete(&self, principal: &Principal, id: ProductId) -> ServiceResult<()> {
        let product = self.get(id).await?;
        Gate::owner_or(&product.owner_email, &[Role::Moderator, Role::Admin]).check(principal)?;

        let deleted = self
            .store
            .run("delete_product", self.store.get().delete_product(id))
            .await?;
        if !deleted {
            return Err(ServiceError::NotFound("product"));
        }
        info!("product deleted");
        Ok(())
    }
}
