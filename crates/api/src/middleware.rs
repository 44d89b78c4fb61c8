use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use discoverly_infra::{AccessControl, ServiceError};

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub access: AccessControl,
}

/// Require a valid bearer credential for a registered user.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?.to_string();
    let path = req.uri().path().to_string();

    let principal = state.access.authenticate(Some(&token)).await.map_err(|e| {
        tracing::warn!(error = %e, %path, "authentication failed");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(PrincipalContext::new(principal));
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ServiceError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| ServiceError::unauthorized("missing authorization header"))?;

    let header = header
        .to_str()
        .map_err(|_| ServiceError::unauthorized("authorization header is not valid text"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ServiceError::unauthorized("expected a bearer token"))?
        .trim();
    if token.is_empty() {
        return Err(ServiceError::unauthorized("missing bearer token"));
    }

    Ok(token)
}
