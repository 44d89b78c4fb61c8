use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use discoverly_core::{DomainError, Email, Entity, ProductId};

/// Moderation status lifecycle.
///
/// ```text
/// pending ──► accepted
///    │           ▲ │
///    ▼           │ ▼
/// rejected ◄─────┘
/// ```
///
/// Nothing ever returns to `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl ProductStatus {
    /// Review-queue rank: untriaged first. Stores reject any other status.
    pub fn rank(self) -> u8 {
        match self {
            ProductStatus::Pending => 1,
            ProductStatus::Accepted => 2,
            ProductStatus::Rejected => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Pending => "pending",
            ProductStatus::Accepted => "accepted",
            ProductStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProductStatus::Pending),
            "accepted" => Some(ProductStatus::Accepted),
            "rejected" => Some(ProductStatus::Rejected),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: ProductStatus) -> bool {
        self == next || next != ProductStatus::Pending
    }
}

impl core::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted product.
///
/// # Invariants
/// - `is_accepted ⇔ status == Accepted` and `is_rejected ⇔ status == Rejected`.
/// - `upvote_count == vote_users.len()`.
/// - `id`, `owner_email` and `created_at` never change after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub owner_email: Email,
    pub owner_name: Option<String>,
    pub owner_image: Option<String>,
    pub product_name: String,
    pub description: String,
    pub link: String,
    pub image: Option<String>,
    pub tags: BTreeSet<String>,
    pub status: ProductStatus,
    pub is_featured: bool,
    pub is_accepted: bool,
    pub is_rejected: bool,
    pub upvote_count: u64,
    pub vote_users: BTreeSet<Email>,
    pub created_at: DateTime<Utc>,
}

/// Submission payload (owner comes from the authenticated principal).
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub product_name: String,
    #[serde(default)]
    pub description: String,
    pub link: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub owner_image: Option<String>,
}

/// Editable details. Moderation state and votes are not reachable from here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsPatch {
    pub product_name: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub image: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Partial moderation update; absent fields are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationPatch {
    pub status: Option<ProductStatus>,
    pub is_accepted: Option<bool>,
    pub is_rejected: Option<bool>,
    pub is_featured: Option<bool>,
}

/// The concrete fields a moderation patch changes, after normalization.
///
/// `status` implies both mirror flags, so they are never set separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModerationChange {
    pub status: Option<ProductStatus>,
    pub is_featured: Option<bool>,
}

impl ModerationChange {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.is_featured.is_none()
    }
}

/// One-free-product rule for unsubscribed owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionQuota {
    pub is_subscribed: bool,
    pub free_products: u64,
}

impl SubmissionQuota {
    pub fn for_owner(is_subscribed: bool) -> Self {
        Self {
            is_subscribed,
            free_products: 1,
        }
    }

    /// Products of any status count toward the limit.
    pub fn allows(&self, already_owned: u64) -> bool {
        self.is_subscribed || already_owned < self.free_products
    }
}

/// Trimmed tag as the caller spelled it; blank tags are dropped.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim();
    if tag.is_empty() { None } else { Some(tag.to_string()) }
}

/// Case-folded form used for tag comparisons.
pub fn tag_key(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Keeps the first spelling of tags that differ only in case.
fn normalize_tags(raw: &[String]) -> BTreeSet<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(|t| normalize_tag(t))
        .filter(|t| seen.insert(tag_key(t)))
        .collect()
}

fn required(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

impl Product {
    /// Create a fresh `pending` product with no votes.
    pub fn submit(
        id: ProductId,
        owner_email: Email,
        draft: ProductDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let product_name = required("productName", &draft.product_name)?;
        let link = required("link", &draft.link)?;

        Ok(Self {
            id,
            owner_email,
            owner_name: draft.owner_name,
            owner_image: draft.owner_image,
            product_name,
            description: draft.description.trim().to_string(),
            link,
            image: draft.image,
            tags: normalize_tags(&draft.tags),
            status: ProductStatus::Pending,
            is_featured: false,
            is_accepted: false,
            is_rejected: false,
            upvote_count: 0,
            vote_users: BTreeSet::new(),
            created_at: now,
        })
    }

    /// Apply editable details; returns whether anything changed.
    pub fn apply_details(&mut self, patch: &DetailsPatch) -> Result<bool, DomainError> {
        let name = patch
            .product_name
            .as_deref()
            .map(|n| required("productName", n))
            .transpose()?;
        let link = patch.link.as_deref().map(|l| required("link", l)).transpose()?;
        let before = self.clone();

        if let Some(name) = name {
            self.product_name = name;
        }
        if let Some(description) = &patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(link) = link {
            self.link = link;
        }
        if let Some(image) = &patch.image {
            self.image = Some(image.clone()).filter(|i| !i.trim().is_empty());
        }
        if let Some(tags) = &patch.tags {
            self.tags = normalize_tags(tags);
        }

        Ok(*self != before)
    }

    /// Normalize a moderation patch against the current state.
    ///
    /// Returns only the fields that would actually change; an empty change is
    /// the caller's "no-op" signal.
    pub fn plan_moderation(&self, patch: &ModerationPatch) -> Result<ModerationChange, DomainError> {
        let mut implied: Option<ProductStatus> = patch.status;
        for (flag, status) in [
            (patch.is_accepted, ProductStatus::Accepted),
            (patch.is_rejected, ProductStatus::Rejected),
        ] {
            if flag == Some(true) {
                match implied {
                    Some(existing) if existing != status => {
                        return Err(DomainError::validation(format!(
                            "conflicting moderation fields: {existing} and {status}"
                        )));
                    }
                    _ => implied = Some(status),
                }
            }
        }

        let target = implied.unwrap_or(self.status);
        for (flag, status) in [
            (patch.is_accepted, ProductStatus::Accepted),
            (patch.is_rejected, ProductStatus::Rejected),
        ] {
            if flag == Some(false) && target == status {
                return Err(DomainError::validation(format!(
                    "cannot clear the {status} flag without moving to another status"
                )));
            }
        }

        if !self.status.can_transition_to(target) {
            return Err(DomainError::invariant(format!(
                "cannot move a {} product back to {target}",
                self.status
            )));
        }

        Ok(ModerationChange {
            status: Some(target).filter(|s| *s != self.status),
            is_featured: patch.is_featured.filter(|f| *f != self.is_featured),
        })
    }

    pub fn apply_moderation(&mut self, change: &ModerationChange) {
        if let Some(status) = change.status {
            self.status = status;
            self.is_accepted = status == ProductStatus::Accepted;
            self.is_rejected = status == ProductStatus::Rejected;
        }
        if let Some(featured) = change.is_featured {
            self.is_featured = featured;
        }
    }

    pub fn has_voted(&self, voter: &Email) -> bool {
        self.vote_users.contains(voter)
    }

    /// Add a vote if the voter has not voted yet; returns whether it was recorded.
    ///
    /// Callers must hold the product exclusively for the duration of the call.
    pub fn add_vote(&mut self, voter: &Email) -> bool {
        if !self.vote_users.insert(voter.clone()) {
            return false;
        }
        self.upvote_count = self.vote_users.len() as u64;
        true
    }

    /// Case-insensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        let key = tag_key(tag);
        !key.is_empty() && self.tags.iter().any(|t| tag_key(t) == key)
    }

    /// Featured listings only show accepted products.
    pub fn is_publicly_featured(&self) -> bool {
        self.is_featured && self.is_accepted
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn draft() -> ProductDraft {
        ProductDraft {
            product_name: "Rustacean Radar".to_string(),
            description: "Finds crabs".to_string(),
            link: "https://example.com".to_string(),
            tags: vec![" AI ".to_string(), "dev".to_string(), "".to_string(), "ai".to_string()],
            ..ProductDraft::default()
        }
    }

    fn pending() -> Product {
        Product::submit(ProductId::new(), email("alice@example.com"), draft(), Utc::now()).unwrap()
    }

    #[test]
    fn submit_creates_pending_product_without_votes() {
        let p = pending();
        assert_eq!(p.status, ProductStatus::Pending);
        assert!(!p.is_featured && !p.is_accepted && !p.is_rejected);
        assert_eq!(p.upvote_count, 0);
        assert!(p.vote_users.is_empty());
        assert_eq!(p.tags.iter().cloned().collect::<Vec<_>>(), vec!["AI", "dev"]);
    }

    #[test]
    fn tags_keep_their_spelling_and_match_case_insensitively() {
        let p = pending();
        assert!(p.tags.contains("AI"));
        assert!(p.has_tag("ai"));
        assert!(p.has_tag(" Ai "));
        assert!(p.has_tag("DEV"));
        assert!(!p.has_tag("web"));
        assert!(!p.has_tag("  "));
    }

    #[test]
    fn submit_rejects_empty_name_and_link() {
        let mut d = draft();
        d.product_name = "   ".to_string();
        let err = Product::submit(ProductId::new(), email("a@b.c"), d, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let mut d = draft();
        d.link.clear();
        assert!(Product::submit(ProductId::new(), email("a@b.c"), d, Utc::now()).is_err());
    }

    #[test]
    fn quota_counts_any_status_for_unsubscribed_owners() {
        let free = SubmissionQuota::for_owner(false);
        assert!(free.allows(0));
        assert!(!free.allows(1));

        let paid = SubmissionQuota::for_owner(true);
        assert!(paid.allows(0));
        assert!(paid.allows(42));
    }

    #[test]
    fn details_patch_leaves_moderation_state_alone() {
        let mut p = pending();
        p.apply_moderation(&ModerationChange {
            status: Some(ProductStatus::Accepted),
            is_featured: Some(true),
        });
        p.add_vote(&email("bob@example.com"));
        let before = p.clone();

        let changed = p
            .apply_details(&DetailsPatch {
                product_name: Some("Renamed".to_string()),
                tags: Some(vec!["web".to_string()]),
                ..DetailsPatch::default()
            })
            .unwrap();

        assert!(changed);
        assert_eq!(p.product_name, "Renamed");
        assert_eq!(p.status, before.status);
        assert_eq!(p.is_featured, before.is_featured);
        assert_eq!(p.upvote_count, before.upvote_count);
        assert_eq!(p.vote_users, before.vote_users);
        assert_eq!(p.description, before.description);
    }

    #[test]
    fn status_patch_updates_mirror_flags() {
        let mut p = pending();
        let change = p
            .plan_moderation(&ModerationPatch {
                status: Some(ProductStatus::Rejected),
                ..ModerationPatch::default()
            })
            .unwrap();
        p.apply_moderation(&change);

        assert_eq!(p.status, ProductStatus::Rejected);
        assert!(p.is_rejected);
        assert!(!p.is_accepted);
    }

    #[test]
    fn flag_only_patch_implies_status() {
        let p = pending();
        let change = p
            .plan_moderation(&ModerationPatch {
                is_accepted: Some(true),
                ..ModerationPatch::default()
            })
            .unwrap();
        assert_eq!(change.status, Some(ProductStatus::Accepted));
        assert_eq!(change.is_featured, None);
    }

    #[test]
    fn contradictory_patch_is_rejected() {
        let p = pending();
        let err = p
            .plan_moderation(&ModerationPatch {
                status: Some(ProductStatus::Accepted),
                is_rejected: Some(true),
                ..ModerationPatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = p
            .plan_moderation(&ModerationPatch {
                status: Some(ProductStatus::Accepted),
                is_accepted: Some(false),
                ..ModerationPatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn cannot_return_to_pending() {
        let mut p = pending();
        p.apply_moderation(&ModerationChange {
            status: Some(ProductStatus::Accepted),
            is_featured: None,
        });

        let err = p
            .plan_moderation(&ModerationPatch {
                status: Some(ProductStatus::Pending),
                ..ModerationPatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn accepted_product_can_be_rejected_later() {
        assert!(ProductStatus::Accepted.can_transition_to(ProductStatus::Rejected));
        assert!(ProductStatus::Rejected.can_transition_to(ProductStatus::Accepted));
        assert!(ProductStatus::Pending.can_transition_to(ProductStatus::Pending));
    }

    #[test]
    fn patch_matching_current_state_is_empty() {
        let p = pending();
        let change = p
            .plan_moderation(&ModerationPatch {
                status: Some(ProductStatus::Pending),
                is_featured: Some(false),
                ..ModerationPatch::default()
            })
            .unwrap();
        assert!(change.is_empty());
        assert!(p.plan_moderation(&ModerationPatch::default()).unwrap().is_empty());
    }

    #[test]
    fn featured_is_independent_of_acceptance_but_display_needs_both() {
        let mut p = pending();
        let change = p
            .plan_moderation(&ModerationPatch {
                is_featured: Some(true),
                ..ModerationPatch::default()
            })
            .unwrap();
        p.apply_moderation(&change);
        assert!(p.is_featured);
        assert!(!p.is_publicly_featured());

        p.apply_moderation(&ModerationChange {
            status: Some(ProductStatus::Accepted),
            is_featured: None,
        });
        assert!(p.is_publicly_featured());
    }

    #[test]
    fn votes_are_at_most_once_per_user() {
        let mut p = pending();
        let bob = email("bob@example.com");

        assert!(p.add_vote(&bob));
        assert!(!p.add_vote(&bob));
        assert!(p.has_voted(&bob));
        assert_eq!(p.upvote_count, 1);
        assert_eq!(p.upvote_count as usize, p.vote_users.len());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(pending()).unwrap();
        assert_eq!(json["productName"], "Rustacean Radar");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["upvoteCount"], 0);
        assert_eq!(json["isFeatured"], false);
    }
}
