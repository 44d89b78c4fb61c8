use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use discoverly_auth::NewUser;

use crate::app::dto::{RegistrationResponse, RoleResponse, TokenRequest, TokenResponse};
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn public() -> Router {
    Router::new()
        .route("/users", post(register))
        .route("/users/:email/role", get(role_of))
}

/// Credential issuance; mounted only when enabled in configuration.
pub fn token() -> Router {
    Router::new().route("/jwt", post(issue_token))
}

pub fn protected() -> Router {
    Router::new().route("/users/:email", get(get_user))
}

pub async fn issue_token(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = services.access.issue_token(&body.email).await?;
    Ok(Json(TokenResponse { token }))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
    let response = RegistrationResponse::from(services.access.register(body).await?);
    let status = if response.inserted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

pub async fn role_of(
    Extension(services): Extension<Arc<AppServices>>,
    Path(email): Path<String>,
) -> Result<Json<RoleResponse>, ApiError> {
    let role = services.access.role_of(&email).await?;
    Ok(Json(RoleResponse::new(email, role)))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = services.access.get_user(ctx.principal(), &email).await?;
    Ok(Json(user))
}

