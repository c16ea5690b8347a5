use axum::{
    Json, Router,
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use kopontren_auth::permissions;
use kopontren_infra::services::Services;

use crate::app::{dto, errors::ApiError};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/sales", get(sales_summary))
        .route("/sales/trend", get(sales_trend))
        .route("/sales/top-products", get(top_products))
        .route("/purchases", get(purchase_summary))
        .route("/financial", get(financial))
        .route("/stock", get(stock))
        .route("/projects", get(projects))
}

pub async fn dashboard(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::REPORTS_READ)?;
    Ok(Json(services.dashboard(Utc::now().date_naive()).await))
}

pub async fn sales_summary(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(range): Query<dto::RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::REPORTS_READ)?;
    Ok(Json(services.sales_summary(range.resolve()?).await))
}

pub async fn sales_trend(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(range): Query<dto::RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::REPORTS_READ)?;
    Ok(Json(services.sales_trend(range.resolve()?).await))
}

pub async fn top_products(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(range): Query<dto::RangeQuery>,
    Query(top): Query<dto::TopQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::REPORTS_READ)?;
    Ok(Json(services.top_products(range.resolve()?, top.by, top.limit).await))
}

pub async fn purchase_summary(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(range): Query<dto::RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::REPORTS_READ)?;
    Ok(Json(services.purchase_summary(range.resolve()?).await))
}

pub async fn financial(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(range): Query<dto::RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::REPORTS_READ)?;
    Ok(Json(services.financial_report(range.resolve()?).await))
}

pub async fn stock(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::REPORTS_READ)?;
    Ok(Json(services.stock_report().await))
}

pub async fn projects(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::REPORTS_READ)?;
    Ok(Json(services.project_report().await))
}
