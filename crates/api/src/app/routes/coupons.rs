use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};

use discoverly_catalog::{CouponPatch, NewCoupon};
use discoverly_core::CouponId;

use crate::app::dto::{self, DeletedResponse};
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn public() -> Router {
    Router::new().route("/coupons", get(list_active))
}

pub fn protected() -> Router {
    Router::new()
        .route("/coupons", post(create))
        .route("/coupons/:id", patch(update).delete(remove))
}

pub async fn list_active(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.coupons.list_active().await?))
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<NewCoupon>,
) -> Result<impl IntoResponse, ApiError> {
    let coupon = services.coupons.create(ctx.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<CouponPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CouponId = dto::parse_id(&id)?;
    Ok(Json(services.coupons.update(ctx.principal(), id, body).await?))
}

pub async fn remove(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CouponId = dto::parse_id(&id)?;
    services.coupons.delete(ctx.principal(), id).await?;
    Ok(Json(DeletedResponse { deleted: true }))
}
