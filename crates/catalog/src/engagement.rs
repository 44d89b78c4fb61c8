//! Reports and reviews filed against products.
//!
//! Votes live on the product itself (see [`crate::Product::add_vote`]); the
//! records here are separate documents keyed by their own ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use discoverly_core::{DomainError, Email, Entity, ProductId, ReportId, ReviewId};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A user's flag on a product. At most one per `(product_id, user_email)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    pub product_id: ProductId,
    pub user_email: Email,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct NewReport {
    #[serde(default, alias = "reason")]
    pub body: String,
}

impl Report {
    pub fn file(
        id: ReportId,
        product_id: ProductId,
        user_email: Email,
        new: NewReport,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let body = new.body.trim();
        if body.is_empty() {
            return Err(DomainError::validation("report reason cannot be empty"));
        }
        Ok(Self {
            id,
            product_id,
            user_email,
            body: body.to_string(),
            created_at: now,
        })
    }
}

impl Entity for Report {
    type Id = ReportId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Append-only product review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub author_email: Email,
    pub author_name: Option<String>,
    pub author_image: Option<String>,
    pub body: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub body: String,
    pub rating: i64,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_image: Option<String>,
}

impl Review {
    pub fn write(
        id: ReviewId,
        product_id: ProductId,
        author_email: Email,
        new: NewReview,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let body = new.body.trim();
        if body.is_empty() {
            return Err(DomainError::validation("review cannot be empty"));
        }
        let rating = u8::try_from(new.rating)
            .ok()
            .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
            .ok_or_else(|| {
                DomainError::validation(format!("rating must be between {MIN_RATING} and {MAX_RATING}"))
            })?;

        Ok(Self {
            id,
            product_id,
            author_email,
            author_name: new.author_name,
            author_image: new.author_image,
            body: body.to_string(),
            rating,
            created_at: now,
        })
    }
}

impl Entity for Review {
    type Id = ReviewId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bob() -> Email {
        Email::parse("bob@example.com").unwrap()
    }

    #[test]
    fn report_requires_a_reason() {
        let err = Report::file(
            ReportId::new(),
            ProductId::new(),
            bob(),
            NewReport { body: "  ".to_string() },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn report_accepts_reason_alias() {
        let new: NewReport = serde_json::from_str(r#"{"reason":"spam"}"#).unwrap();
        let report = Report::file(ReportId::new(), ProductId::new(), bob(), new, Utc::now()).unwrap();
        assert_eq!(report.body, "spam");
    }

    #[test]
    fn review_rating_bounds() {
        let write = |rating| {
            Review::write(
                ReviewId::new(),
                ProductId::new(),
                bob(),
                NewReview {
                    body: "Great".to_string(),
                    rating,
                    ..NewReview::default()
                },
                Utc::now(),
            )
        };
        assert!(write(0).is_err());
        assert!(write(6).is_err());
        assert!(write(-1).is_err());
        assert_eq!(write(5).unwrap().rating, 5);
    }
}
