use axum::{
    Router,
    extract::{Extension, Path},
    http::header,
    response::IntoResponse,
    routing::get,
};

use kopontren_infra::services::{ServiceError, Services};
use kopontren_infra::uploads::content_type;

use crate::app::errors::ApiError;

pub fn router() -> Router {
    Router::new().route("/products/:name", get(product_image))
}

pub async fn product_image(
    Extension(services): Extension<Services>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = services
        .images()
        .read_product_image(&name)
        .await
        .map_err(ServiceError::from)?;
    Ok(([(header::CONTENT_TYPE, content_type(&name))], bytes))
}
