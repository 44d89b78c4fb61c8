use std::sync::Arc;

use axum::{
    extract::Extension,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use crate::app::dto::{PaymentIntentRequest, SubscriptionRequest};
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn protected() -> Router {
    Router::new()
        .route("/payments/intent", post(create_intent))
        .route("/payments/subscription", post(confirm_subscription))
}

pub async fn create_intent(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<PaymentIntentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.payments.create_intent(ctx.principal(), &body.price).await?))
}

/// Called after the client completes the charge; the provider is asked whether
/// the named intent was actually paid.
pub async fn confirm_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<SubscriptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        services
            .payments
            .confirm_subscription(ctx.principal(), &body.intent_id)
            .await?,
    ))
}
