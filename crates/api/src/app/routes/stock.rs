use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use kopontren_auth::permissions;
use kopontren_infra::services::{MovementFilter, Services};
use kopontren_inventory::StockAdjustment;

use crate::app::{dto, errors::ApiError};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/adjust", post(adjust))
        .route("/movements", get(movements))
        .route("/low", get(super::products::low_stock))
}

pub async fn adjust(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<StockAdjustment>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::STOCK_ADJUST)?;
    let movement = services.adjust_stock(principal.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

pub async fn movements(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(filter): Query<MovementFilter>,
    Query(page): Query<dto::PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::STOCK_READ)?;
    Ok(Json(services.list_movements(&filter, page.into()).await))
}
