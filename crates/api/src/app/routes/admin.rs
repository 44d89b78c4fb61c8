use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};

use crate::app::dto::{self, ExcludeQuery, RoleUpdateRequest};
use crate::app::errors::ApiError;
use crate::app::extract::{ApiJson, ApiQuery};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn protected() -> Router {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:email/role", patch(set_role))
        .route("/admin/stats", get(stats))
        .route("/admin/coupons", get(list_coupons))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    ApiQuery(query): ApiQuery<ExcludeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let users = services
        .access
        .list_users(ctx.principal(), query.exclude.as_deref())
        .await?;
    Ok(Json(users))
}

pub async fn set_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(email): Path<String>,
    ApiJson(body): ApiJson<RoleUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = dto::parse_role(&body.role)?;
    let user = services.access.set_role(ctx.principal(), &email, role).await?;
    Ok(Json(user))
}

pub async fn stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.queue.stats(ctx.principal()).await?))
}

pub async fn list_coupons(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.coupons.list_all(ctx.principal()).await?))
}
