//! Store-neutral product queries.
//!
//! A query is a filter, a sort and a window. In-memory stores evaluate it with
//! [`ProductFilter::matches`] and [`ProductSort::compare`]; SQL stores translate
//! the same fields into `WHERE` / `ORDER BY` clauses and must agree with them.

use std::cmp::Ordering;

use discoverly_core::Email;

use crate::product::{Product, ProductStatus, tag_key};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductFilter {
    pub owner: Option<Email>,
    pub status: Option<ProductStatus>,
    pub accepted_only: bool,
    pub featured_only: bool,
    /// Case-folded tag; see [`ProductFilter::with_tag`].
    pub tag: Option<String>,
}

impl ProductFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn owned_by(owner: Email) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    pub fn accepted() -> Self {
        Self {
            accepted_only: true,
            ..Self::default()
        }
    }

    pub fn with_status(status: ProductStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Blank tags are treated as "no tag filter".
    pub fn with_tag(mut self, tag: Option<&str>) -> Self {
        self.tag = tag.map(tag_key).filter(|t| !t.is_empty());
        self
    }

    pub fn featured(mut self) -> Self {
        self.featured_only = true;
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(owner) = &self.owner {
            if &product.owner_email != owner {
                return false;
            }
        }
        if let Some(status) = self.status {
            if product.status != status {
                return false;
            }
        }
        if self.accepted_only && !product.is_accepted {
            return false;
        }
        if self.featured_only && !product.is_featured {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !product.has_tag(tag) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    /// `created_at` descending.
    #[default]
    Newest,
    /// Status rank ascending, then `created_at` descending.
    ReviewRank,
    /// `upvote_count` descending, then `created_at` descending.
    MostUpvoted,
}

impl ProductSort {
    pub fn compare(self, a: &Product, b: &Product) -> Ordering {
        let newest = b.created_at.cmp(&a.created_at);
        let ordering = match self {
            ProductSort::Newest => newest,
            ProductSort::ReviewRank => a.status.rank().cmp(&b.status.rank()).then(newest),
            ProductSort::MostUpvoted => b.upvote_count.cmp(&a.upvote_count).then(newest),
        };
        // Ids are time-ordered UUIDs; they make the order total.
        ordering.then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
    }
}

/// Filter + sort + window.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: ProductSort,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl ProductQuery {
    pub fn new(filter: ProductFilter, sort: ProductSort) -> Self {
        Self {
            filter,
            sort,
            skip: 0,
            limit: None,
        }
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluate the query over an in-memory snapshot.
    pub fn run<'a, I>(&self, products: I) -> Vec<Product>
    where
        I: IntoIterator<Item = &'a Product>,
    {
        let mut matched: Vec<&Product> = products
            .into_iter()
            .filter(|p| self.filter.matches(p))
            .collect();
        matched.sort_by(|a, b| self.sort.compare(a, b));

        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        matched.into_iter().skip(skip).take(limit).cloned().collect()
    }
}
