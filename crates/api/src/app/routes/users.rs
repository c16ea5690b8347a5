use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use kopontren_auth::{NewUser, UserUpdate, permissions};
use kopontren_core::UserId;
use kopontren_infra::services::Services;

use crate::app::{dto, errors::ApiError};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", axum::routing::patch(update_user))
        .route("/:id/reset-password", post(reset_password))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub q: Option<String>,
}

pub async fn list_users(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<UserQuery>,
    Query(page): Query<dto::PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::USERS_MANAGE)?;
    Ok(Json(services.list_users(query.q.as_deref(), page.into()).await))
}

pub async fn create_user(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::USERS_MANAGE)?;
    let user = services
        .create_user(
            principal.principal(),
            NewUser {
                username: body.username,
                full_name: body.full_name,
                role: body.role,
            },
            &body.password,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<UserId>,
    Json(body): Json<UserUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::USERS_MANAGE)?;
    Ok(Json(services.update_user(principal.principal(), id, body).await?))
}

pub async fn reset_password(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<UserId>,
    Json(body): Json<dto::ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::USERS_MANAGE)?;
    services.reset_password(principal.principal(), id, &body.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}
