//! Engagement ledger: votes, reports and reviews.
//!
//! Each "at most once" rule is enforced by a single conditional store write,
//! never by a prior read.

use chrono::Utc;
use tracing::{info, instrument, warn};

use discoverly_auth::{Gate, Principal, Role};
use discoverly_catalog::{NewReport, NewReview, Product, Report, Review};
use discoverly_core::{ProductId, ReportId, ReviewId};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{StoreHandle, VoteOutcome};

#[derive(Debug, Clone)]
pub struct EngagementLedger {
    store: StoreHandle,
}

impl EngagementLedger {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    async fn product(&self, id: ProductId) -> ServiceResult<Product> {
        self.store
            .run("find_product", self.store.get().find_product(id))
            .await?
            .ok_or(ServiceError::NotFound("product"))
    }

    /// One vote per user per product; owners cannot vote for their own.
    #[instrument(skip(self, principal), fields(product_id = %id, voter = %principal.email), err)]
    pub async fn upvote(&self, principal: &Principal, id: ProductId) -> ServiceResult<Product> {
        Gate::authenticated().check(principal)?;
        let product = self.product(id).await?;
        if principal.owns(&product.owner_email) {
            warn!("owner tried to upvote own product");
            return Err(ServiceError::forbidden("owners cannot upvote their own product"));
        }

        let outcome = self
            .store
            .run("add_vote", self.store.get().add_vote(id, &principal.email))
            .await?;
        match outcome {
            VoteOutcome::Recorded(product) => {
                info!(upvotes = product.upvote_count, "vote recorded");
                Ok(product)
            }
            VoteOutcome::AlreadyVoted => Err(ServiceError::AlreadyVoted),
            VoteOutcome::NotFound => Err(ServiceError::NotFound("product")),
        }
    }

    #[instrument(skip(self, principal, new), fields(product_id = %id, reporter = %principal.email), err)]
    pub async fn report(&self, principal: &Principal, id: ProductId, new: NewReport) -> ServiceResult<Report> {
        Gate::authenticated().check(principal)?;
        self.product(id).await?;
        let report = Report::file(ReportId::new(), id, principal.email.clone(), new, Utc::now())?;

        let inserted = self
            .store
            .run("insert_report_unique", self.store.get().insert_report_unique(report.clone()))
            .await?;
        if !inserted {
            return Err(ServiceError::DuplicateReport);
        }
        info!(report_id = %report.id, "product reported");
        Ok(report)
    }

    /// Newest first.
    pub async fn list_reports(&self, principal: &Principal) -> ServiceResult<Vec<Report>> {
        Gate::role(Role::Moderator).check(principal)?;
        Ok(self
            .store
            .run("list_reports", self.store.get().list_reports())
            .await?)
    }

    /// Remove exactly one report by its id.
    #[instrument(skip(self, principal), fields(report_id = %report_id, moderator = %principal.email), err)]
    pub async fn resolve_report(&self, principal: &Principal, report_id: ReportId) -> ServiceResult<()> {
        Gate::role(Role::Moderator).check(principal)?;
        let deleted = self
            .store
            .run("delete_report", self.store.get().delete_report(report_id))
            .await?;
        if !deleted {
            return Err(ServiceError::NotFound("report"));
        }
        info!("report resolved");
        Ok(())
    }

    #[instrument(skip(self, principal, new), fields(product_id = %id, author = %principal.email), err)]
    pub async fn add_review(&self, principal: &Principal, id: ProductId, new: NewReview) -> ServiceResult<Review> {
        Gate::authenticated().check(principal)?;
        self.product(id).await?;
        let review = Review::write(ReviewId::new(), id, principal.email.clone(), new, Utc::now())?;
        self.store
            .run("insert_review", self.store.get().insert_review(review.clone()))
            .await?;
        info!(review_id = %review.id, rating = review.rating, "review added");
        Ok(review)
    }

    /// Newest first.
    pub async fn list_reviews(&self, id: ProductId) -> ServiceResult<Vec<Review>> {
        Ok(self
            .store
            .run("list_reviews", self.store.get().list_reviews(id))
            .await?)
    }
}
