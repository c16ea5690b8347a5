use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use kopontren_auth::Principal;
use kopontren_core::{DomainError, Page, PageRequest};
use kopontren_inventory::{MovementType, ReferenceType, StockMovement, StockReference};
use kopontren_products::{Product, ProductId};
use kopontren_projects::{
    MaterialId, MaterialInput, MaterialUsage, NewProject, Project, ProjectId, ProjectStatus, ProjectSummary,
    ProjectUpdate,
};

use super::stock::crossed_low_stock;
use super::{ServiceResult, Services, require};
use crate::audit::{self, AuditAction};
use crate::store::Tables;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    /// Matches code, name or location.
    pub q: Option<String>,
}

/// Plan a product for a project. Without a price the product's buy price is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MaterialRequest {
    pub product_id: ProductId,
    pub estimated_quantity: i64,
    pub estimated_unit_price: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UsageRequest {
    pub material_id: MaterialId,
    pub quantity: i64,
    /// Defaults to today (UTC).
    pub usage_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub summary: ProjectSummary,
}

fn stock_of(t: &Tables) -> impl Fn(ProductId) -> i64 + '_ {
    move |id| t.products.get(&id).map(|p| p.stock).unwrap_or(0)
}

impl Services {
    pub async fn list_projects(&self, filter: &ProjectFilter, page: PageRequest) -> Page<Project> {
        let q = filter.q.as_deref().unwrap_or_default().trim().to_lowercase();
        self.store
            .read(|t| {
                let mut rows: Vec<Project> = t
                    .projects
                    .values()
                    .filter(|p| filter.status.is_none_or(|s| p.status == s))
                    .filter(|p| {
                        q.is_empty()
                            || p.code.to_lowercase().contains(&q)
                            || p.name.to_lowercase().contains(&q)
                            || p.location.as_deref().is_some_and(|l| l.to_lowercase().contains(&q))
                    })
                    .cloned()
                    .collect();
                rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Page::from_vec(rows, page)
            })
            .await
    }

    pub async fn get_project(&self, id: ProjectId) -> ServiceResult<ProjectDetail> {
        self.store
            .read(|t| {
                t.projects.get(&id).map(|p| ProjectDetail {
                    summary: ProjectSummary::build(p, stock_of(t)),
                    project: p.clone(),
                })
            })
            .await
            .ok_or_else(|| DomainError::not_found("project").into())
    }

    pub async fn project_summary(&self, id: ProjectId) -> ServiceResult<ProjectSummary> {
        Ok(self.get_project(id).await?.summary)
    }

    /// Usage bookings of one project, newest first.
    pub async fn list_material_usages(&self, id: ProjectId, page: PageRequest) -> ServiceResult<Page<MaterialUsage>> {
        self.get_project(id).await?;
        Ok(self
            .store
            .read(|t| {
                let mut rows: Vec<MaterialUsage> =
                    t.material_usages.values().filter(|u| u.project_id == id).cloned().collect();
                rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
                Page::from_vec(rows, page)
            })
            .await)
    }

    #[instrument(skip(self, actor, input), fields(actor = %actor.username), err)]
    pub async fn create_project(&self, actor: &Principal, input: NewProject) -> ServiceResult<Project> {
        let now = Utc::now();
        let project = Project::create(input, actor.user_id, now)?;
        self.store
            .write(|tx| -> ServiceResult<Project> {
                if tx.tables().projects.values().any(|p| p.code == project.code) {
                    return Err(DomainError::conflict(format!("project code {} is already used", project.code)).into());
                }
                audit::record(
                    tx,
                    actor,
                    AuditAction::Create,
                    "project",
                    Some(project.id.into()),
                    json!({ "code": project.code, "budget": project.budget }),
                    now,
                )?;
                tx.put(project.clone())?;
                Ok(project)
            })
            .await
    }

    #[instrument(skip(self, actor, update), fields(actor = %actor.username), err)]
    pub async fn update_project(&self, actor: &Principal, id: ProjectId, update: ProjectUpdate) -> ServiceResult<Project> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Project> {
                let mut project = require::<Project>(tx, id, "project")?;
                project.update(update, now)?;
                audit::record(tx, actor, AuditAction::Update, "project", Some(id.into()), json!({ "code": project.code }), now)?;
                tx.put(project.clone())?;
                Ok(project)
            })
            .await
    }

    #[instrument(skip(self, actor), fields(actor = %actor.username), err)]
    pub async fn change_project_status(
        &self,
        actor: &Principal,
        id: ProjectId,
        status: ProjectStatus,
    ) -> ServiceResult<Project> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Project> {
                let mut project = require::<Project>(tx, id, "project")?;
                let from = project.status;
                project.transition(status, now)?;
                audit::record(
                    tx,
                    actor,
                    AuditAction::ChangeStatus,
                    "project",
                    Some(id.into()),
                    json!({ "code": project.code, "from": from, "to": status }),
                    now,
                )?;
                tx.put(project.clone())?;
                Ok(project)
            })
            .await
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.username), err)]
    pub async fn add_project_material(
        &self,
        actor: &Principal,
        id: ProjectId,
        request: MaterialRequest,
    ) -> ServiceResult<Project> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Project> {
                let mut project = require::<Project>(tx, id, "project")?;
                let product = require::<Product>(tx, request.product_id, "product")?;
                product.ensure_active()?;
                let material_id = project.add_material(
                    MaterialInput {
                        product_id: product.id,
                        product_name: product.name.clone(),
                        unit: product.unit.clone(),
                        estimated_quantity: request.estimated_quantity,
                        estimated_unit_price: request.estimated_unit_price.unwrap_or(product.buy_price),
                        notes: request.notes,
                    },
                    now,
                )?;
                audit::record(
                    tx,
                    actor,
                    AuditAction::Update,
                    "project",
                    Some(id.into()),
                    json!({ "material_added": material_id, "product": product.code }),
                    now,
                )?;
                tx.put(project.clone())?;
                Ok(project)
            })
            .await
    }

    #[instrument(skip(self, actor), fields(actor = %actor.username), err)]
    pub async fn update_project_material(
        &self,
        actor: &Principal,
        id: ProjectId,
        material_id: MaterialId,
        estimated_quantity: i64,
        estimated_unit_price: i64,
    ) -> ServiceResult<Project> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Project> {
                let mut project = require::<Project>(tx, id, "project")?;
                project.update_estimate(material_id, estimated_quantity, estimated_unit_price, now)?;
                audit::record(
                    tx,
                    actor,
                    AuditAction::Update,
                    "project",
                    Some(id.into()),
                    json!({
                        "material_updated": material_id,
                        "estimated_quantity": estimated_quantity,
                        "estimated_unit_price": estimated_unit_price,
                    }),
                    now,
                )?;
                tx.put(project.clone())?;
                Ok(project)
            })
            .await
    }

    #[instrument(skip(self, actor), fields(actor = %actor.username), err)]
    pub async fn remove_project_material(
        &self,
        actor: &Principal,
        id: ProjectId,
        material_id: MaterialId,
    ) -> ServiceResult<Project> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Project> {
                let mut project = require::<Project>(tx, id, "project")?;
                project.remove_material(material_id, now)?;
                audit::record(tx, actor, AuditAction::Update, "project", Some(id.into()), json!({ "material_removed": material_id }), now)?;
                tx.put(project.clone())?;
                Ok(project)
            })
            .await
    }

    /// Take material out of stock for an IN_PROGRESS project at the product's buy price.
    #[instrument(skip(self, actor, request), fields(actor = %actor.username), err)]
    pub async fn record_material_usage(
        &self,
        actor: &Principal,
        id: ProjectId,
        request: UsageRequest,
    ) -> ServiceResult<MaterialUsage> {
        let now = Utc::now();
        let (usage, low) = self
            .store
            .write(|tx| -> ServiceResult<(MaterialUsage, Option<Product>)> {
                let mut project = require::<Project>(tx, id, "project")?;
                let product_id = project.material(request.material_id)?.product_id;
                let mut product = require::<Product>(tx, product_id, "product")?;
                product.ensure_active()?;

                let usage = project.record_usage(
                    request.material_id,
                    request.quantity,
                    product.buy_price,
                    request.usage_date.unwrap_or_else(|| now.date_naive()),
                    request.notes,
                    actor.user_id,
                    now,
                )?;
                let movement = StockMovement::apply(
                    &mut product,
                    MovementType::Out,
                    usage.quantity,
                    StockReference::document(ReferenceType::Project, project.id, project.code.clone()),
                    usage.notes.clone(),
                    actor.user_id,
                    now,
                )?;
                let low = crossed_low_stock(&movement, &product).then(|| product.clone());

                audit::record(
                    tx,
                    actor,
                    AuditAction::UseMaterial,
                    "project",
                    Some(id.into()),
                    json!({
                        "code": project.code,
                        "product": product.code,
                        "quantity": usage.quantity,
                        "total_cost": usage.total_cost,
                    }),
                    now,
                )?;
                tx.put(movement)?;
                tx.put(product)?;
                tx.put(project)?;
                tx.put(usage.clone())?;
                Ok((usage, low))
            })
            .await?;
        info!(project = %id, quantity = usage.quantity, "material used");
        if let Some(product) = low {
            self.notify_low_stock(std::slice::from_ref(&product));
        }
        Ok(usage)
    }
}
