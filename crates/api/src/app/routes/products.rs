use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};

use discoverly_catalog::{DetailsPatch, ModerationPatch, NewReport, NewReview, PageRequest, ProductDraft};
use discoverly_core::ProductId;

use crate::app::dto::{self, AcceptedQuery, DeletedResponse};
use crate::app::errors::ApiError;
use crate::app::extract::{ApiJson, ApiQuery};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn public() -> Router {
    Router::new()
        .route("/products/featured", get(featured))
        .route("/products/trending", get(trending))
        .route("/products/accepted", get(accepted))
        .route("/products/:id/reviews", get(list_reviews))
}

pub fn protected() -> Router {
    Router::new()
        .route("/products", post(submit))
        .route("/products/review-queue", get(review_queue))
        .route(
            "/products/:id",
            get(get_product).patch(edit_details).delete(delete_product),
        )
        .route("/products/:id/moderation", patch(set_moderation))
        .route("/products/:id/upvote", post(upvote))
        .route("/products/:id/reports", post(report))
        .route("/products/:id/reviews", post(add_review))
        .route("/owners/:email/products", get(list_by_owner))
}

pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<ProductDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let product = services.lifecycle.submit(ctx.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProductId = dto::parse_id(&id)?;
    Ok(Json(services.lifecycle.get(id).await?))
}

pub async fn edit_details(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<DetailsPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProductId = dto::parse_id(&id)?;
    Ok(Json(services.lifecycle.edit_details(ctx.principal(), id, body).await?))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProductId = dto::parse_id(&id)?;
    services.lifecycle.delete(ctx.principal(), id).await?;
    Ok(Json(DeletedResponse { deleted: true }))
}

pub async fn set_moderation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ModerationPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProductId = dto::parse_id(&id)?;
    Ok(Json(
        services
            .lifecycle
            .set_moderation_flags(ctx.principal(), id, body)
            .await?,
    ))
}

pub async fn list_by_owner(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.lifecycle.list_by_owner(ctx.principal(), &email).await?))
}

pub async fn review_queue(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.queue.list_for_review(ctx.principal()).await?))
}

pub async fn featured(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.queue.featured().await?))
}

pub async fn trending(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.queue.trending().await?))
}

pub async fn accepted(
    Extension(services): Extension<Arc<AppServices>>,
    ApiQuery(query): ApiQuery<AcceptedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = PageRequest::new(query.page, query.limit)?;
    Ok(Json(services.queue.accepted(query.tag.as_deref(), request).await?))
}

pub async fn upvote(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProductId = dto::parse_id(&id)?;
    Ok(Json(services.ledger.upvote(ctx.principal(), id).await?))
}

pub async fn report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<NewReport>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProductId = dto::parse_id(&id)?;
    let report = services.ledger.report(ctx.principal(), id, body).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn add_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<NewReview>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProductId = dto::parse_id(&id)?;
    let review = services.ledger.add_review(ctx.principal(), id, body).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_reviews(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProductId = dto::parse_id(&id)?;
    Ok(Json(services.ledger.list_reviews(id).await?))
}
