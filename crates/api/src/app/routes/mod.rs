use axum::Router;

pub mod audit;
pub mod auth;
pub mod categories;
pub mod notifications;
pub mod products;
pub mod projects;
pub mod purchases;
pub mod reports;
pub mod stock;
pub mod suppliers;
pub mod system;
pub mod transactions;
pub mod uploads;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router(max_upload_bytes: usize) -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/categories", categories::router())
        .nest("/products", products::router(max_upload_bytes))
        .nest("/suppliers", suppliers::router())
        .nest("/purchase-orders", purchases::router())
        .nest("/stock", stock::router())
        .nest("/transactions", transactions::router())
        .nest("/projects", projects::router())
        .nest("/reports", reports::router())
        .nest("/audit-logs", audit::router())
        .nest("/notifications", notifications::router())
        .nest("/uploads", uploads::router())
}
