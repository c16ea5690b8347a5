use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use kopontren_core::{
    DomainError, DomainResult, Entity, UserId, entity_id,
    error::{checked_add, checked_mul, non_negative, optional_text, positive, required_text},
};
use kopontren_products::ProductId;

entity_id! {
    /// Project identifier.
    pub struct ProjectId; "project id"
}

entity_id! {
    /// Planned material line identifier.
    pub struct MaterialId; "material id"
}

entity_id! {
    /// Material usage identifier.
    pub struct MaterialUsageId; "material usage id"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [Self::Planning, Self::InProgress, Self::Completed, Self::Cancelled];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "PLANNING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        matches!(
            (self, next),
            (Self::Planning, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::Planning, Self::Cancelled)
                | (Self::InProgress, Self::Cancelled)
        )
    }
}

impl core::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown project status '{s}'")))
    }
}

/// Planned material with running usage totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMaterial {
    pub id: MaterialId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit: String,
    pub estimated_quantity: i64,
    pub estimated_unit_price: i64,
    pub used_quantity: i64,
    pub used_cost: i64,
    pub notes: Option<String>,
}

impl ProjectMaterial {
    pub fn estimated_cost(&self) -> i64 {
        self.estimated_quantity.saturating_mul(self.estimated_unit_price)
    }
}

/// Material line input; product name and unit are resolved by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialInput {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit: String,
    pub estimated_quantity: i64,
    pub estimated_unit_price: i64,
    pub notes: Option<String>,
}

/// One booking of material taken from the store for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialUsage {
    pub id: MaterialUsageId,
    pub project_id: ProjectId,
    pub material_id: MaterialId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: i64,
    pub total_cost: i64,
    pub usage_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Entity for MaterialUsage {
    type Id = MaterialUsageId;

    fn id(&self) -> MaterialUsageId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: ProjectStatus,
    pub budget: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub materials: Vec<ProjectMaterial>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Project {
    type Id = ProjectId;

    fn id(&self) -> ProjectId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProject {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub budget: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub budget: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> DomainResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(DomainError::validation("end date is before the start date"));
        }
    }
    Ok(())
}

impl Project {
    pub fn create(input: NewProject, by: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        check_dates(input.start_date, input.end_date)?;
        Ok(Self {
            id: ProjectId::new(),
            code: required_text("project code", &input.code, 32)?.to_uppercase(),
            name: required_text("project name", &input.name, 150)?,
            description: optional_text(input.description),
            location: optional_text(input.location),
            status: ProjectStatus::Planning,
            budget: non_negative("budget", input.budget)?,
            start_date: input.start_date,
            end_date: input.end_date,
            materials: Vec::new(),
            created_by: by,
            created_at: now,
            updated_at: now,
        })
    }

    fn ensure_open(&self) -> DomainResult<()> {
        if self.status.is_closed() {
            return Err(DomainError::invalid_state(format!(
                "project {} is {}",
                self.code, self.status
            )));
        }
        Ok(())
    }

    pub fn update(&mut self, update: ProjectUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_open()?;
        let start = update.start_date.or(self.start_date);
        let end = update.end_date.or(self.end_date);
        check_dates(start, end)?;
        let name = match update.name {
            Some(name) => required_text("project name", &name, 150)?,
            None => self.name.clone(),
        };
        let budget = match update.budget {
            Some(b) => non_negative("budget", b)?,
            None => self.budget,
        };
        self.name = name;
        self.budget = budget;
        self.start_date = start;
        self.end_date = end;
        if let Some(d) = update.description {
            self.description = optional_text(Some(d));
        }
        if let Some(l) = update.location {
            self.location = optional_text(Some(l));
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn transition(&mut self, next: ProjectStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invalid_state(format!(
                "project {} cannot move from {} to {}",
                self.code, self.status, next
            )));
        }
        if next == ProjectStatus::InProgress && self.start_date.is_none() {
            self.start_date = Some(now.date_naive());
        }
        if next == ProjectStatus::Completed && self.end_date.is_none() {
            self.end_date = Some(now.date_naive());
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn material(&self, id: MaterialId) -> DomainResult<&ProjectMaterial> {
        self.materials
            .iter()
            .find(|m| m.id == id)
            .ok_or(DomainError::not_found("project material"))
    }

    pub fn add_material(&mut self, input: MaterialInput, now: DateTime<Utc>) -> DomainResult<MaterialId> {
        self.ensure_open()?;
        if self.materials.iter().any(|m| m.product_id == input.product_id) {
            return Err(DomainError::conflict(format!(
                "{} is already planned for project {}",
                input.product_name, self.code
            )));
        }
        non_negative("estimated quantity", input.estimated_quantity)?;
        non_negative("estimated unit price", input.estimated_unit_price)?;
        checked_mul("estimated cost", input.estimated_quantity, input.estimated_unit_price)?;
        let id = MaterialId::new();
        self.materials.push(ProjectMaterial {
            id,
            product_id: input.product_id,
            product_name: input.product_name,
            unit: input.unit,
            estimated_quantity: input.estimated_quantity,
            estimated_unit_price: input.estimated_unit_price,
            used_quantity: 0,
            used_cost: 0,
            notes: optional_text(input.notes),
        });
        self.updated_at = now;
        Ok(id)
    }

    pub fn update_estimate(
        &mut self,
        id: MaterialId,
        estimated_quantity: i64,
        estimated_unit_price: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_open()?;
        non_negative("estimated quantity", estimated_quantity)?;
        non_negative("estimated unit price", estimated_unit_price)?;
        checked_mul("estimated cost", estimated_quantity, estimated_unit_price)?;
        let material = self
            .materials
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(DomainError::not_found("project material"))?;
        material.estimated_quantity = estimated_quantity;
        material.estimated_unit_price = estimated_unit_price;
        self.updated_at = now;
        Ok(())
    }

    pub fn remove_material(&mut self, id: MaterialId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_open()?;
        let material = self.material(id)?;
        if material.used_quantity > 0 {
            return Err(DomainError::conflict(format!(
                "{} has recorded usage and cannot be removed",
                material.product_name
            )));
        }
        self.materials.retain(|m| m.id != id);
        self.updated_at = now;
        Ok(())
    }

    /// Book `quantity` of a planned material at `unit_cost`.
    ///
    /// The stock movement is the caller's job; this only records the usage.
    pub fn record_usage(
        &mut self,
        material_id: MaterialId,
        quantity: i64,
        unit_cost: i64,
        usage_date: NaiveDate,
        notes: Option<String>,
        by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<MaterialUsage> {
        if self.status != ProjectStatus::InProgress {
            return Err(DomainError::invalid_state(format!(
                "materials can only be used while project {} is IN_PROGRESS",
                self.code
            )));
        }
        positive("quantity", quantity)?;
        let total_cost = checked_mul("usage cost", quantity, unit_cost)?;
        let project_id = self.id;
        let material = self
            .materials
            .iter_mut()
            .find(|m| m.id == material_id)
            .ok_or(DomainError::not_found("project material"))?;
        let used_quantity = checked_add("used quantity", material.used_quantity, quantity)?;
        let used_cost = checked_add("used cost", material.used_cost, total_cost)?;
        material.used_quantity = used_quantity;
        material.used_cost = used_cost;
        self.updated_at = now;

        Ok(MaterialUsage {
            id: MaterialUsageId::new(),
            project_id,
            material_id,
            product_id: material.product_id,
            quantity,
            unit_cost,
            total_cost,
            usage_date,
            notes: optional_text(notes),
            created_by: by,
            created_at: now,
        })
    }
}
