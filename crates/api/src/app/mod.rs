//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and service construction
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses
//! - `extract.rs`: body/query extractors that reject with those responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

use services::AppServices;

/// Router switches taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct AppOptions {
    /// Mount `POST /jwt`.
    pub token_endpoint: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            token_endpoint: true,
        }
    }
}

impl From<&discoverly_infra::AppConfig> for AppOptions {
    fn from(config: &discoverly_infra::AppConfig) -> Self {
        Self {
            token_endpoint: config.token_endpoint_enabled,
        }
    }
}

/// Build the full HTTP router around already-constructed services.
pub fn build_app(services: Arc<AppServices>, options: AppOptions) -> Router {
    let auth_state = middleware::AuthState {
        access: services.access.clone(),
    };

    // Protected routes: require a credential for a registered user.
    let protected = routes::protected().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public(options))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
