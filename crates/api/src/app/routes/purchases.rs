use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use kopontren_auth::permissions;
use kopontren_infra::services::{CreatePurchaseOrder, PurchaseOrderFilter, Services, UpdatePurchaseOrder};
use kopontren_purchasing::PurchaseOrderId;

use crate::app::{dto, errors::ApiError};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order).put(update_order))
        .route("/:id/send", post(send_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/receive", post(receive_order))
}

pub async fn list_orders(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(filter): Query<PurchaseOrderFilter>,
    Query(page): Query<dto::PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PURCHASES_READ)?;
    Ok(Json(services.list_purchase_orders(&filter, page.into()).await))
}

pub async fn get_order(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<PurchaseOrderId>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PURCHASES_READ)?;
    Ok(Json(services.get_purchase_order(id).await?))
}

pub async fn create_order(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CreatePurchaseOrder>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PURCHASES_WRITE)?;
    let po = services.create_purchase_order(principal.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(po)))
}

pub async fn update_order(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<PurchaseOrderId>,
    Json(body): Json<UpdatePurchaseOrder>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PURCHASES_WRITE)?;
    Ok(Json(services.update_purchase_order(principal.principal(), id, body).await?))
}

pub async fn send_order(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<PurchaseOrderId>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PURCHASES_WRITE)?;
    Ok(Json(services.send_purchase_order(principal.principal(), id).await?))
}

pub async fn cancel_order(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<PurchaseOrderId>,
    body: Option<Json<dto::ReasonRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PURCHASES_WRITE)?;
    let reason = body.and_then(|Json(b)| b.reason);
    Ok(Json(services.cancel_purchase_order(principal.principal(), id, reason).await?))
}

/// Book the goods: an empty body receives every line in full.
pub async fn receive_order(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<PurchaseOrderId>,
    body: Option<Json<dto::ReceiveRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PURCHASES_RECEIVE)?;
    let overrides = body.map(|Json(b)| b.items).unwrap_or_default();
    Ok(Json(services.receive_purchase_order(principal.principal(), id, overrides).await?))
}
