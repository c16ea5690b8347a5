use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};

use kopontren_auth::permissions;
use kopontren_infra::services::Services;
use kopontren_products::{CategoryId, CategoryInput};

use crate::app::errors::ApiError;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", put(update_category).delete(delete_category))
}

pub async fn list_categories(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::CATALOG_READ)?;
    Ok(Json(services.list_categories().await))
}

pub async fn create_category(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::CATALOG_WRITE)?;
    let category = services.create_category(principal.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<CategoryId>,
    Json(body): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::CATALOG_WRITE)?;
    Ok(Json(services.update_category(principal.principal(), id, body).await?))
}

pub async fn delete_category(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<CategoryId>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::CATALOG_WRITE)?;
    services.delete_category(principal.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
