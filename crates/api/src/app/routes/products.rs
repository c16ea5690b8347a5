use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Extension, Multipart, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use kopontren_auth::permissions;
use kopontren_infra::services::{ProductFilter, Services};
use kopontren_products::{NewProduct, ProductId, ProductUpdate};

use crate::app::{dto, errors::ApiError};
use crate::authz::require;
use crate::context::PrincipalContext;

/// Multipart framing on top of the image itself.
const MULTIPART_SLACK: usize = 64 * 1024;

pub fn router(max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/barcode/:code", get(product_by_barcode))
        .route("/low-stock", get(low_stock))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(deactivate_product),
        )
        .route("/:id/barcode", post(generate_barcode))
        .route("/:id/price-history", get(price_history))
        .route(
            "/:id/image",
            post(upload_image).layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_SLACK)),
        )
}

pub async fn list_products(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(filter): Query<ProductFilter>,
    Query(page): Query<dto::PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::CATALOG_READ)?;
    Ok(Json(services.list_products(&filter, page.into()).await))
}

pub async fn get_product(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::CATALOG_READ)?;
    Ok(Json(services.get_product(id).await?))
}

pub async fn product_by_barcode(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::CATALOG_READ)?;
    Ok(Json(services.product_by_barcode(&code).await?))
}

pub async fn low_stock(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::STOCK_READ)?;
    Ok(Json(services.low_stock_products().await))
}

pub async fn create_product(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(options): Query<dto::BarcodeQuery>,
    Json(body): Json<NewProduct>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::CATALOG_WRITE)?;
    let product = services
        .create_product(principal.principal(), body, options.generate_barcode)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::CATALOG_WRITE)?;
    Ok(Json(services.update_product(principal.principal(), id, body).await?))
}

pub async fn deactivate_product(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::CATALOG_WRITE)?;
    Ok(Json(services.deactivate_product(principal.principal(), id).await?))
}

pub async fn generate_barcode(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::CATALOG_WRITE)?;
    Ok(Json(services.generate_barcode(principal.principal(), id).await?))
}

pub async fn price_history(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<ProductId>,
    Query(page): Query<dto::PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::CATALOG_READ)?;
    Ok(Json(services.price_history(id, page.into()).await?))
}

/// `multipart/form-data` with a single `image` field.
pub async fn upload_image(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<ProductId>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::CATALOG_WRITE)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        let product = services
            .set_product_image(principal.principal(), id, &file_name, &bytes)
            .await?;
        return Ok(Json(product));
    }

    Err(ApiError::bad_request("missing 'image' field"))
}
