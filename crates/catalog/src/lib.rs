//! Catalog domain module.
//!
//! Products, their moderation state machine, publication queries, engagement
//! records (reports, reviews) and coupons, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod coupon;
pub mod engagement;
pub mod moderation;
pub mod product;
pub mod query;

pub use coupon::{Coupon, CouponPatch, NewCoupon};
pub use engagement::{NewReport, NewReview, Report, Review};
pub use moderation::{Page, PageRequest};
pub use product::{
    DetailsPatch, ModerationChange, ModerationPatch, Product, ProductDraft, ProductStatus,
    SubmissionQuota,
};
pub use query::{ProductFilter, ProductQuery, ProductSort};
