use axum::{routing::get, Router};

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod common;
pub mod orders;
pub mod system;

/// Router for endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .merge(catalog::router())
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .merge(cart::router())
        .merge(orders::router())
        .nest("/admin", admin::router())
}
