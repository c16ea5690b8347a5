use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use kopontren_auth::permissions;
use kopontren_infra::services::{MaterialRequest, ProjectFilter, Services, UsageRequest};
use kopontren_projects::{MaterialId, NewProject, ProjectId, ProjectUpdate};

use crate::app::{dto, errors::ApiError};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/:id", get(get_project).put(update_project))
        .route("/:id/status", post(change_status))
        .route("/:id/summary", get(summary))
        .route("/:id/materials", post(add_material))
        .route(
            "/:id/materials/:material_id",
            put(update_material).delete(remove_material),
        )
        .route("/:id/usages", get(list_usages).post(record_usage))
}

pub async fn list_projects(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(filter): Query<ProjectFilter>,
    Query(page): Query<dto::PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PROJECTS_READ)?;
    Ok(Json(services.list_projects(&filter, page.into()).await))
}

pub async fn get_project(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<ProjectId>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PROJECTS_READ)?;
    Ok(Json(services.get_project(id).await?))
}

pub async fn summary(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<ProjectId>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PROJECTS_READ)?;
    Ok(Json(services.project_summary(id).await?))
}

pub async fn create_project(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewProject>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PROJECTS_WRITE)?;
    let project = services.create_project(principal.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn update_project(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<ProjectId>,
    Json(body): Json<ProjectUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PROJECTS_WRITE)?;
    Ok(Json(services.update_project(principal.principal(), id, body).await?))
}

pub async fn change_status(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<ProjectId>,
    Json(body): Json<dto::StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PROJECTS_WRITE)?;
    Ok(Json(services.change_project_status(principal.principal(), id, body.status).await?))
}

pub async fn add_material(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<ProjectId>,
    Json(body): Json<MaterialRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PROJECTS_WRITE)?;
    let project = services.add_project_material(principal.principal(), id, body).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn update_material(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, material_id)): Path<(ProjectId, MaterialId)>,
    Json(body): Json<dto::MaterialEstimateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PROJECTS_WRITE)?;
    let project = services
        .update_project_material(
            principal.principal(),
            id,
            material_id,
            body.estimated_quantity,
            body.estimated_unit_price,
        )
        .await?;
    Ok(Json(project))
}

pub async fn remove_material(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, material_id)): Path<(ProjectId, MaterialId)>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PROJECTS_WRITE)?;
    Ok(Json(services.remove_project_material(principal.principal(), id, material_id).await?))
}

pub async fn list_usages(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<ProjectId>,
    Query(page): Query<dto::PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PROJECTS_READ)?;
    Ok(Json(services.list_material_usages(id, page.into()).await?))
}

pub async fn record_usage(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<ProjectId>,
    Json(body): Json<UsageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &permissions::PROJECTS_WRITE)?;
    let usage = services.record_material_usage(principal.principal(), id, body).await?;
    Ok((StatusCode::CREATED, Json(usage)))
}
