use axum::Router;

use super::AppOptions;

pub mod admin;
pub mod coupons;
pub mod payments;
pub mod products;
pub mod reports;
pub mod system;
pub mod users;

/// Endpoints that need no credential.
pub fn public(options: AppOptions) -> Router {
    let mut router = Router::new()
        .merge(system::public())
        .merge(users::public())
        .merge(products::public())
        .merge(coupons::public());
    if options.token_endpoint {
        router = router.merge(users::token());
    }
    router
}

/// Endpoints behind the auth middleware; handlers receive a `PrincipalContext`.
pub fn protected() -> Router {
    Router::new()
        .merge(system::protected())
        .merge(users::protected())
        .merge(products::protected())
        .merge(reports::protected())
        .merge(coupons::protected())
        .merge(payments::protected())
        .merge(admin::protected())
}
