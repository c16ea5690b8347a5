use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use kopontren_auth::permissions;
use kopontren_infra::services::{Services, SupplierFilter};
use kopontren_suppliers::{SupplierId, SupplierInput};

use crate::app::{dto, errors::ApiError};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route(
            "/:id",
            get(get_supplier).put(update_supplier).delete(deactivate_supplier),
        )
}

pub async fn list_suppliers(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(filter): Query<SupplierFilter>,
    Query(page): Query<dto::PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::SUPPLIERS_READ)?;
    Ok(Json(services.list_suppliers(&filter, page.into()).await))
}

pub async fn get_supplier(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<SupplierId>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::SUPPLIERS_READ)?;
    Ok(Json(services.get_supplier(id).await?))
}

pub async fn create_supplier(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<SupplierInput>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::SUPPLIERS_WRITE)?;
    let supplier = services.create_supplier(principal.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<SupplierId>,
    Json(body): Json<SupplierInput>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::SUPPLIERS_WRITE)?;
    Ok(Json(services.update_supplier(principal.principal(), id, body).await?))
}

pub async fn deactivate_supplier(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<SupplierId>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::SUPPLIERS_WRITE)?;
    Ok(Json(services.deactivate_supplier(principal.principal(), id).await?))
}
