use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use kopontren_infra::services::Services;

use crate::app::{dto, errors::ApiError};
use crate::context::PrincipalContext;

/// Protected part of `/auth`; `/auth/login` is mounted publicly in `build_app`.
pub fn router() -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/change-password", post(change_password))
}

pub async fn login(
    Extension(services): Extension<Services>,
    Json(body): Json<dto::LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = services.login(&body.username, &body.password).await?;
    Ok(Json(result))
}

pub async fn me(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    let user = services.me(principal.principal()).await?;
    Ok(Json(serde_json::json!({
        "user": user,
        "permissions": principal.principal().permissions(),
    })))
}

pub async fn change_password(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    services
        .change_password(principal.principal(), &body.current_password, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
