use axum::{http::StatusCode, routing::get, Extension, Json, Router};

use discoverly_auth::Principal;

use crate::context::PrincipalContext;

pub fn public() -> Router {
    Router::new().route("/health", get(health))
}

pub fn protected() -> Router {
    Router::new().route("/whoami", get(whoami))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<PrincipalContext>) -> Json<Principal> {
    Json(ctx.principal().clone())
}
