//! Moderation queue and publication sets.
//!
//! Each listing is a canonical [`ProductQuery`]; stores only have to evaluate
//! queries, never re-derive the publication rules.

use serde::Serialize;

use discoverly_core::DomainError;

use crate::query::{ProductFilter, ProductQuery, ProductSort};

pub const FEATURED_LIMIT: u64 = 4;
pub const TRENDING_LIMIT: u64 = 6;
pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 6;

/// Every product, untriaged first, newest first within each status.
pub fn review_queue() -> ProductQuery {
    ProductQuery::new(ProductFilter::all(), ProductSort::ReviewRank)
}

/// Up to four featured *and* accepted products, newest first.
pub fn featured() -> ProductQuery {
    ProductQuery::new(ProductFilter::accepted().featured(), ProductSort::Newest).limit(FEATURED_LIMIT)
}

/// Up to six accepted products by upvotes; ties broken newest first.
pub fn trending() -> ProductQuery {
    ProductQuery::new(ProductFilter::accepted(), ProductSort::MostUpvoted).limit(TRENDING_LIMIT)
}

/// Accepted products, optionally by tag, newest first (unwindowed filter).
pub fn accepted_filter(tag: Option<&str>) -> ProductFilter {
    ProductFilter::accepted().with_tag(tag)
}

/// One page of [`accepted_filter`].
pub fn accepted_page(tag: Option<&str>, page: PageRequest) -> ProductQuery {
    ProductQuery::new(accepted_filter(tag), ProductSort::Newest)
        .skip(page.skip())
        .limit(page.page_size)
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Validate raw query parameters; absent values take the defaults.
    ///
    /// Any positive page size is accepted.
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Result<Self, DomainError> {
        let page = positive("page", page.unwrap_or(DEFAULT_PAGE as i64))?;
        let page_size = positive("limit", page_size.unwrap_or(DEFAULT_PAGE_SIZE as i64))?;
        Ok(Self { page, page_size })
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

fn positive(name: &str, value: i64) -> Result<u64, DomainError> {
    u64::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| DomainError::validation(format!("{name} must be a positive integer")))
}

/// A page of results plus totals. Out-of-range pages are empty, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            current_page: request.page,
            total_pages: total_count.div_ceil(request.page_size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            current_page: self.current_page,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{ModerationChange, Product, ProductDraft, ProductStatus};
    use chrono::{Duration, TimeZone, Utc};
    use discoverly_core::{Email, ProductId};

    fn product(minutes: i64, status: ProductStatus, tags: &[&str]) -> Product {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut p = Product::submit(
            ProductId::new(),
            Email::parse("owner@example.com").unwrap(),
            ProductDraft {
                product_name: format!("p{minutes}"),
                link: "https://example.com".to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                ..ProductDraft::default()
            },
            base + Duration::minutes(minutes),
        )
        .unwrap();
        p.apply_moderation(&ModerationChange {
            status: Some(status).filter(|s| *s != ProductStatus::Pending),
            is_featured: None,
        });
        p
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.product_name.as_str()).collect()
    }

    #[test]
    fn review_queue_puts_pending_first_newest_first() {
        let products = vec![
            product(0, ProductStatus::Rejected, &[]),
            product(1, ProductStatus::Accepted, &[]),
            product(2, ProductStatus::Pending, &[]),
            product(3, ProductStatus::Accepted, &[]),
            product(4, ProductStatus::Pending, &[]),
            product(5, ProductStatus::Rejected, &[]),
        ];
        let ordered = review_queue().run(&products);
        assert_eq!(names(&ordered), vec!["p4", "p2", "p3", "p1", "p5", "p0"]);
    }

    #[test]
    fn featured_requires_acceptance_and_caps_at_four() {
        let mut products: Vec<Product> = (0..6)
            .map(|m| {
                let mut p = product(m, ProductStatus::Accepted, &[]);
                p.is_featured = true;
                p
            })
            .collect();
        let mut unaccepted = product(10, ProductStatus::Pending, &[]);
        unaccepted.is_featured = true;
        products.push(unaccepted);

        let listed = featured().run(&products);
        assert_eq!(names(&listed), vec!["p5", "p4", "p3", "p2"]);
    }

    #[test]
    fn trending_orders_by_votes_then_recency() {
        let mut products: Vec<Product> =
            (0..8).map(|m| product(m, ProductStatus::Accepted, &[])).collect();
        products[0].upvote_count = 9;
        products[3].upvote_count = 5;
        products[6].upvote_count = 5;
        products.push(product(20, ProductStatus::Pending, &[]));
        products[8].upvote_count = 100;

        let listed = trending().run(&products);
        assert_eq!(listed.len(), 6);
        assert_eq!(names(&listed)[..3], ["p0", "p6", "p3"]);
        assert!(listed.iter().all(|p| p.is_accepted));
    }

    #[test]
    fn page_two_holds_items_seven_to_twelve() {
        let products: Vec<Product> = (0..15)
            .map(|m| product(m, ProductStatus::Accepted, &["ai"]))
            .chain((15..20).map(|m| product(m, ProductStatus::Accepted, &["web"])))
            .collect();

        let request = PageRequest::new(Some(2), Some(6)).unwrap();
        let items = accepted_page(Some("ai"), request).run(&products);
        let total = products
            .iter()
            .filter(|p| accepted_filter(Some("ai")).matches(p))
            .count() as u64;
        let page = Page::new(items, total, request);

        assert_eq!(names(&page.items), vec!["p8", "p7", "p6", "p5", "p4", "p3"]);
        assert_eq!(page.total_count, 15);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 2);
    }

    #[test]
    fn out_of_range_page_is_empty_with_totals() {
        let products: Vec<Product> =
            (0..3).map(|m| product(m, ProductStatus::Accepted, &[])).collect();
        let request = PageRequest::new(Some(9), None).unwrap();
        let page = Page::new(accepted_page(None, request).run(&products), 3, request);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn page_request_validation() {
        assert_eq!(PageRequest::new(None, None).unwrap(), PageRequest::default());
        assert!(PageRequest::new(Some(0), None).is_err());
        assert!(PageRequest::new(None, Some(-3)).is_err());
        assert!(PageRequest::new(None, Some(0)).is_err());

        let wide = PageRequest::new(Some(2), Some(500)).unwrap();
        assert_eq!(wide.page_size, 500);
        assert_eq!(wide.skip(), 500);
        let huge = PageRequest::new(Some(i64::MAX), Some(i64::MAX)).unwrap();
        assert_eq!(huge.skip(), u64::MAX);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn status() -> impl Strategy<Value = ProductStatus> {
            prop_oneof![
                Just(ProductStatus::Pending),
                Just(ProductStatus::Accepted),
                Just(ProductStatus::Rejected),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: review queue is bucketed by status rank, newest first inside a bucket.
            #[test]
            fn review_queue_is_ranked(entries in prop::collection::vec((0i64..500, status()), 0..40)) {
                let products: Vec<Product> = entries
                    .iter()
                    .map(|(m, s)| product(*m, *s, &[]))
                    .collect();
                let ordered = review_queue().run(&products);

                prop_assert_eq!(ordered.len(), products.len());
                for pair in ordered.windows(2) {
                    let (a, b) = (&pair[0], &pair[1]);
                    prop_assert!(a.status.rank() <= b.status.rank());
                    if a.status == b.status {
                        prop_assert!(a.created_at >= b.created_at);
                    }
                }
            }

            /// Property: total_pages == ceil(total / page_size) and pages partition the set.
            #[test]
            fn pages_partition_accepted_set(count in 0usize..40, size in 1i64..10) {
                let products: Vec<Product> = (0..count as i64)
                    .map(|m| product(m, ProductStatus::Accepted, &[]))
                    .collect();
                let total = products.len() as u64;
                let first = PageRequest::new(Some(1), Some(size)).unwrap();
                let pages = Page::<Product>::new(vec![], total, first).total_pages;
                prop_assert_eq!(pages, total.div_ceil(size as u64));

                let mut seen = Vec::new();
                for n in 1..=pages.max(1) {
                    let req = PageRequest::new(Some(n as i64), Some(size)).unwrap();
                    seen.extend(accepted_page(None, req).run(&products));
                }
                prop_assert_eq!(seen, accepted_page(None, PageRequest::new(Some(1), Some(100)).unwrap()).limit(u64::MAX).run(&products));
            }
        }
    }
}
