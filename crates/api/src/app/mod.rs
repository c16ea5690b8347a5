//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and query mapping
//! - `errors.rs`: consistent JSON error responses

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tower::ServiceBuilder;

use kopontren_infra::services::Services;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the tests).
pub fn build_app(services: Services) -> Router {
    let auth_state = middleware::AuthState {
        services: services.clone(),
    };
    let max_upload_bytes = services.images().max_bytes();

    // Protected routes: require a valid bearer token.
    let protected = routes::router(max_upload_bytes).layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/login", post(routes::auth::login))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
