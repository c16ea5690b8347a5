use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use kopontren_auth::permissions;
use kopontren_infra::services::{CheckoutRequest, Services, TransactionFilter};
use kopontren_sales::TransactionId;

use crate::app::{dto, errors::ApiError};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_transactions).post(checkout))
        .route("/:id", get(get_transaction))
        .route("/:id/pay", post(pay))
        .route("/:id/void", post(void))
}

pub async fn checkout(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::SALES_CREATE)?;
    let trx = services.checkout(principal.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(trx)))
}

pub async fn list_transactions(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(filter): Query<TransactionFilter>,
    Query(page): Query<dto::PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::SALES_READ)?;
    Ok(Json(services.list_transactions(&filter, page.into()).await))
}

pub async fn get_transaction(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<TransactionId>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::SALES_READ)?;
    Ok(Json(services.get_transaction(id).await?))
}

pub async fn pay(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<TransactionId>,
    Json(body): Json<dto::PayRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::SALES_PAY)?;
    Ok(Json(services.pay_transaction(principal.principal(), id, body.amount).await?))
}

pub async fn void(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<TransactionId>,
    body: Option<Json<dto::ReasonRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::SALES_VOID)?;
    let reason = body.and_then(|Json(b)| b.reason);
    Ok(Json(services.void_transaction(principal.principal(), id, reason).await?))
}
