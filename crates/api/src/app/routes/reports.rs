use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};

use discoverly_core::ReportId;

use crate::app::dto::{self, DeletedResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn protected() -> Router {
    Router::new()
        .route("/reports", get(list_reports))
        .route("/reports/:id", delete(resolve_report))
}

pub async fn list_reports(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.ledger.list_reports(ctx.principal()).await?))
}

pub async fn resolve_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ReportId = dto::parse_id(&id)?;
    services.ledger.resolve_report(ctx.principal(), id).await?;
    Ok(Json(DeletedResponse { deleted: true }))
}
