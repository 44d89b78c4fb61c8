//! Postgres-backed marketplace store.
//!
//! Queries are built at runtime (`sqlx::query` / `QueryBuilder`) and rows are
//! mapped by hand, so no database is needed at compile time.
//!
//! ## Conditional writes
//!
//! | Operation | Mechanism |
//! |-----------|-----------|
//! | `insert_product_within_quota` | transaction + `pg_advisory_xact_lock(hashtext(owner))`, count, insert |
//! | `add_vote` | single `UPDATE .. WHERE NOT ($voter = ANY(vote_users))` |
//! | `apply_moderation` | `UPDATE .. WHERE id = $1 AND status = $expected` |
//! | `insert_report_unique` | `ON CONFLICT ON CONSTRAINT reports_once_per_user DO NOTHING` |
//! | `insert_coupon` / `replace_coupon` | `UNIQUE (code)`; `23505` maps to "code taken" |
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | `PoolClosed`, `PoolTimedOut`, `Io` | `Unavailable` |
//! | `Database` (any code not handled by the caller) | `Backend` |
//! | row decode failures | `Corrupt` |
//! | other | `Backend` |

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;

use discoverly_auth::{Role, User};
use discoverly_catalog::{
    Coupon, ModerationChange, Product, ProductFilter, ProductQuery, ProductSort, ProductStatus,
    Report, Review, SubmissionQuota,
};
use discoverly_core::{CouponId, Email, ProductId, ReportId, ReviewId};

use super::{
    CouponWrite, MarketplaceStore, ModerationWrite, QuotaOutcome, StoreError, VoteOutcome,
};

const SCHEMA: &str = include_str!("../../migrations/0001_marketplace.sql");

const PRODUCT_COLUMNS: &str = "id, owner_email, owner_name, owner_image, product_name, \
     description, link, image, tags, status, is_featured, is_accepted, is_rejected, \
     upvote_count, vote_users, created_at";

const USER_COLUMNS: &str = "email, name, photo_url, role, is_subscribed, created_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema. Safe to run on every startup.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn product_exists(&self, id: ProductId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_exists", e))
    }
}

#[async_trait]
impl MarketplaceStore for PostgresStore {
    #[instrument(skip(self, user), fields(email = %user.email), err)]
    async fn insert_user_if_absent(&self, user: User) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, name, photo_url, role, is_subscribed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(user.email.as_str())
        .bind(&user.name)
        .bind(&user.photo_url)
        .bind(user.role.as_str())
        .bind(user.is_subscribed)
        .bind(user.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user_if_absent", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_user(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users_except(&self, exclude: &Email) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email <> $1 ORDER BY created_at ASC, email ASC"
        ))
        .bind(exclude.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users_except", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self), fields(email = %email), err)]
    async fn set_user_role(&self, email: &Email, role: Role) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET role = $2 WHERE email = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(role.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_user_role", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), fields(email = %email), err)]
    async fn set_user_subscribed(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET is_subscribed = TRUE WHERE email = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(email.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_user_subscribed", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?;
        to_u64("users.count", count)
    }

    #[instrument(
        skip(self, product),
        fields(product_id = %product.id, owner = %product.owner_email),
        err
    )]
    async fn insert_product_within_quota(
        &self,
        product: Product,
        quota: SubmissionQuota,
    ) -> Result<QuotaOutcome, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Serializes submissions per owner until commit/rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(product.owner_email.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("quota_lock", e))?;

        let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE owner_email = $1")
            .bind(product.owner_email.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("quota_count", e))?;

        if !quota.allows(to_u64("products.count", owned)?) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(QuotaOutcome::Exceeded);
        }

        let tags: Vec<String> = product.tags.iter().cloned().collect();
        let votes: Vec<String> = product.vote_users.iter().map(|e| e.as_str().to_string()).collect();
        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
        ))
        .bind(product.id.as_uuid())
        .bind(product.owner_email.as_str())
        .bind(&product.owner_name)
        .bind(&product.owner_image)
        .bind(&product.product_name)
        .bind(&product.description)
        .bind(&product.link)
        .bind(&product.image)
        .bind(&tags)
        .bind(product.status.as_str())
        .bind(product.is_featured)
        .bind(product.is_accepted)
        .bind(product.is_rejected)
        .bind(to_i64(product.upvote_count))
        .bind(&votes)
        .bind(product.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(QuotaOutcome::Inserted)
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, query), fields(sort = ?query.sort, skip = query.skip, limit = ?query.limit), err)]
    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_filter(&mut builder, &query.filter);
        builder.push(" ORDER BY ").push(order_by(query.sort));
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(to_i64(limit));
        }
        if query.skip > 0 {
            builder.push(" OFFSET ").push_bind(to_i64(query.skip));
        }

        let rows = builder
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filter(&mut builder, filter);
        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;
        to_u64("products.count", count)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn write_product_details(&self, product: &Product) -> Result<bool, StoreError> {
        let tags: Vec<String> = product.tags.iter().cloned().collect();
        let result = sqlx::query(
            r#"
            UPDATE products
            SET product_name = $2, description = $3, link = $4, image = $5, tags = $6
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.product_name)
        .bind(&product.description)
        .bind(&product.link)
        .bind(&product.image)
        .bind(&tags)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("write_product_details", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, change), fields(product_id = %id, expected = %expected), err)]
    async fn apply_moderation(
        &self,
        id: ProductId,
        expected: ProductStatus,
        change: &ModerationChange,
    ) -> Result<ModerationWrite, StoreError> {
        let status = change.status.unwrap_or(expected);
        let row = sqlx::query(&format!(
            "UPDATE products \
             SET status = $3, is_accepted = $4, is_rejected = $5, \
                 is_featured = COALESCE($6, is_featured) \
             WHERE id = $1 AND status = $2 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .bind(status.as_str())
        .bind(status == ProductStatus::Accepted)
        .bind(status == ProductStatus::Rejected)
        .bind(change.is_featured)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("apply_moderation", e))?;

        match row {
            Some(row) => Ok(ModerationWrite::Applied(product_from_row(&row)?)),
            None if self.product_exists(id).await? => Ok(ModerationWrite::Stale),
            None => Ok(ModerationWrite::NotFound),
        }
    }

    #[instrument(skip(self), fields(product_id = %id, voter = %voter), err)]
    async fn add_vote(&self, id: ProductId, voter: &Email) -> Result<VoteOutcome, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE products \
             SET vote_users = array_append(vote_users, $2), upvote_count = upvote_count + 1 \
             WHERE id = $1 AND NOT ($2 = ANY(vote_users)) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(voter.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_vote", e))?;

        match row {
            Some(row) => Ok(VoteOutcome::Recorded(product_from_row(&row)?)),
            None if self.product_exists(id).await? => Ok(VoteOutcome::AlreadyVoted),
            None => Ok(VoteOutcome::NotFound),
        }
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, report), fields(product_id = %report.product_id), err)]
    async fn insert_report_unique(&self, report: Report) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO reports (id, product_id, user_email, body, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT reports_once_per_user DO NOTHING
            "#,
        )
        .bind(report.id.as_uuid())
        .bind(report.product_id.as_uuid())
        .bind(report.user_email.as_str())
        .bind(&report.body)
        .bind(report.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_report_unique", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_reports(&self) -> Result<Vec<Report>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, product_id, user_email, body, created_at FROM reports ORDER BY created_at DESC",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_reports", e))?;

        rows.iter()
            .map(|row| -> Result<Report, StoreError> {
                Ok(Report {
                    id: ReportId::from_uuid(row.try_get("id").map_err(corrupt)?),
                    product_id: ProductId::from_uuid(row.try_get("product_id").map_err(corrupt)?),
                    user_email: email_column(row, "user_email")?,
                    body: row.try_get("body").map_err(corrupt)?,
                    created_at: row.try_get("created_at").map_err(corrupt)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(report_id = %id), err)]
    async fn delete_report(&self, id: ReportId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_report", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_review(&self, review: Review) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, product_id, author_email, author_name, author_image, body, rating, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(review.id.as_uuid())
        .bind(review.product_id.as_uuid())
        .bind(review.author_email.as_str())
        .bind(&review.author_name)
        .bind(&review.author_image)
        .bind(&review.body)
        .bind(i16::from(review.rating))
        .bind(review.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_review", e))?;
        Ok(())
    }

    async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, author_email, author_name, author_image, body, rating, created_at
            FROM reviews
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_reviews", e))?;

        rows.iter()
            .map(|row| -> Result<Review, StoreError> {
                let rating: i16 = row.try_get("rating").map_err(corrupt)?;
                Ok(Review {
                    id: ReviewId::from_uuid(row.try_get("id").map_err(corrupt)?),
                    product_id: ProductId::from_uuid(row.try_get("product_id").map_err(corrupt)?),
                    author_email: email_column(row, "author_email")?,
                    author_name: row.try_get("author_name").map_err(corrupt)?,
                    author_image: row.try_get("author_image").map_err(corrupt)?,
                    body: row.try_get("body").map_err(corrupt)?,
                    rating: u8::try_from(rating)
                        .map_err(|_| StoreError::Corrupt(format!("review rating {rating}")))?,
                    created_at: row.try_get("created_at").map_err(corrupt)?,
                })
            })
            .collect()
    }

    async fn count_reviews(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_reviews", e))?;
        to_u64("reviews.count", count)
    }

    #[instrument(skip(self, coupon), fields(code = %coupon.code), err)]
    async fn insert_coupon(&self, coupon: Coupon) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO coupons (id, code, expiry, description, discount)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(coupon.id.as_uuid())
        .bind(&coupon.code)
        .bind(coupon.expiry)
        .bind(&coupon.description)
        .bind(coupon.discount)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_coupon", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_coupon(&self, id: CouponId) -> Result<Option<Coupon>, StoreError> {
        let row = sqlx::query("SELECT id, code, expiry, description, discount FROM coupons WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_coupon", e))?;
        row.as_ref().map(coupon_from_row).transpose()
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, code, expiry, description, discount FROM coupons ORDER BY expiry ASC, code ASC",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_coupons", e))?;
        rows.iter().map(coupon_from_row).collect()
    }

    #[instrument(skip(self, coupon), fields(coupon_id = %coupon.id), err)]
    async fn replace_coupon(&self, coupon: &Coupon) -> Result<CouponWrite, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET code = $2, expiry = $3, description = $4, discount = $5
            WHERE id = $1
            "#,
        )
        .bind(coupon.id.as_uuid())
        .bind(&coupon.code)
        .bind(coupon.expiry)
        .bind(&coupon.description)
        .bind(coupon.discount)
        .execute(&*self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(CouponWrite::Written),
            Ok(_) => Ok(CouponWrite::NotFound),
            Err(e) if is_unique_violation(&e) => Ok(CouponWrite::CodeTaken),
            Err(e) => Err(map_sqlx_error("replace_coupon", e)),
        }
    }

    #[instrument(skip(self), fields(coupon_id = %id), err)]
    async fn delete_coupon(&self, id: CouponId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_coupon", e))?;
        Ok(result.rows_affected() == 1)
    }
}

/// Translate a [`ProductFilter`] into `WHERE` clauses; must agree with
/// `ProductFilter::matches`.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    builder.push(" WHERE TRUE");
    if let Some(owner) = &filter.owner {
        builder.push(" AND owner_email = ").push_bind(owner.as_str().to_string());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if filter.accepted_only {
        builder.push(" AND is_accepted");
    }
    if filter.featured_only {
        builder.push(" AND is_featured");
    }
    if let Some(tag) = &filter.tag {
        builder
            .push(" AND EXISTS (SELECT 1 FROM unnest(tags) AS t(tag) WHERE lower(t.tag) = ")
            .push_bind(tag.clone())
            .push(")");
    }
}

/// Must agree with `ProductSort::compare`, including the id tie-break.
fn order_by(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Newest => "created_at DESC, id DESC",
        ProductSort::ReviewRank => {
            "CASE status WHEN 'pending' THEN 1 WHEN 'accepted' THEN 2 WHEN 'rejected' THEN 3 END ASC, \
             created_at DESC, id DESC"
        }
        ProductSort::MostUpvoted => "upvote_count DESC, created_at DESC, id DESC",
    }
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let status: String = row.try_get("status").map_err(corrupt)?;
    let tags: Vec<String> = row.try_get("tags").map_err(corrupt)?;
    let votes: Vec<String> = row.try_get("vote_users").map_err(corrupt)?;
    let upvote_count: i64 = row.try_get("upvote_count").map_err(corrupt)?;

    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id").map_err(corrupt)?),
        owner_email: email_column(row, "owner_email")?,
        owner_name: row.try_get("owner_name").map_err(corrupt)?,
        owner_image: row.try_get("owner_image").map_err(corrupt)?,
        product_name: row.try_get("product_name").map_err(corrupt)?,
        description: row.try_get("description").map_err(corrupt)?,
        link: row.try_get("link").map_err(corrupt)?,
        image: row.try_get("image").map_err(corrupt)?,
        tags: tags.into_iter().collect(),
        status: ProductStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown product status '{status}'")))?,
        is_featured: row.try_get("is_featured").map_err(corrupt)?,
        is_accepted: row.try_get("is_accepted").map_err(corrupt)?,
        is_rejected: row.try_get("is_rejected").map_err(corrupt)?,
        upvote_count: to_u64("products.upvote_count", upvote_count)?,
        vote_users: votes
            .iter()
            .map(|v| Email::parse(v).map_err(|e| StoreError::Corrupt(e.to_string())))
            .collect::<Result<_, _>>()?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role: String = row.try_get("role").map_err(corrupt)?;
    Ok(User {
        email: email_column(row, "email")?,
        name: row.try_get("name").map_err(corrupt)?,
        photo_url: row.try_get("photo_url").map_err(corrupt)?,
        role: Role::from_str(&role).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        is_subscribed: row.try_get("is_subscribed").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
    })
}

fn coupon_from_row(row: &PgRow) -> Result<Coupon, StoreError> {
    Ok(Coupon {
        id: CouponId::from_uuid(row.try_get("id").map_err(corrupt)?),
        code: row.try_get("code").map_err(corrupt)?,
        expiry: row.try_get("expiry").map_err(corrupt)?,
        description: row.try_get("description").map_err(corrupt)?,
        discount: row.try_get("discount").map_err(corrupt)?,
    })
}

fn email_column(row: &PgRow, column: &str) -> Result<Email, StoreError> {
    let raw: String = row.try_get(column).map_err(corrupt)?;
    Email::parse(&raw).map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

fn corrupt(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

fn to_u64(column: &str, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} is negative: {value}")))
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Backend(format!(
            "database error in {operation}: {} (code {})",
            db_err.message(),
            db_err.code().as_deref().unwrap_or("none")
        )),
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {operation}"))
        }
        sqlx::Error::Io(io) => StoreError::Unavailable(format!("io error in {operation}: {io}")),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("decode error in {operation}: {err}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
