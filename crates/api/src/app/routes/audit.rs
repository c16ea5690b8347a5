use axum::{
    Json, Router,
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
};

use kopontren_auth::permissions;
use kopontren_infra::audit::AuditFilter;
use kopontren_infra::services::Services;

use crate::app::{dto, errors::ApiError};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/", get(list_audit_logs))
}

pub async fn list_audit_logs(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(filter): Query<AuditFilter>,
    Query(page): Query<dto::PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::AUDIT_READ)?;
    Ok(Json(services.audit_logs(&filter, page.into()).await))
}
