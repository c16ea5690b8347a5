//! Budget and material-usage summary for a project.

use serde::Serialize;

use kopontren_products::ProductId;

use crate::project::{MaterialId, Project, ProjectStatus};

/// `part / whole * 100`, rounded to two decimals; 0 when `whole` is 0.
pub fn percent(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 10_000.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialSummary {
    pub material_id: MaterialId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit: String,
    pub estimated_quantity: i64,
    pub estimated_cost: i64,
    pub used_quantity: i64,
    pub used_cost: i64,
    pub usage_percent: f64,
    pub remaining_quantity: i64,
    pub over_usage: i64,
    pub current_stock: i64,
    /// Units still needed that the store does not have.
    pub shortfall: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub project_id: crate::ProjectId,
    pub code: String,
    pub name: String,
    pub status: ProjectStatus,
    pub budget: i64,
    pub materials: Vec<MaterialSummary>,
    pub total_estimated_cost: i64,
    pub total_used_cost: i64,
    pub material_usage_percent: f64,
    pub budget_remaining: i64,
    pub budget_usage_percent: f64,
    pub over_budget: bool,
}

impl ProjectSummary {
    /// Build the summary; `stock_of` returns the current stock for a product.
    pub fn build(project: &Project, stock_of: impl Fn(ProductId) -> i64) -> Self {
        let materials: Vec<MaterialSummary> = project
            .materials
            .iter()
            .map(|m| {
                let remaining = (m.estimated_quantity - m.used_quantity).max(0);
                let current_stock = stock_of(m.product_id);
                MaterialSummary {
                    material_id: m.id,
                    product_id: m.product_id,
                    product_name: m.product_name.clone(),
                    unit: m.unit.clone(),
                    estimated_quantity: m.estimated_quantity,
                    estimated_cost: m.estimated_cost(),
                    used_quantity: m.used_quantity,
                    used_cost: m.used_cost,
                    usage_percent: percent(m.used_quantity, m.estimated_quantity),
                    remaining_quantity: remaining,
                    over_usage: (m.used_quantity - m.estimated_quantity).max(0),
                    current_stock,
                    shortfall: (remaining - current_stock).max(0),
                }
            })
            .collect();

        let total_estimated_cost = materials.iter().map(|m| m.estimated_cost).fold(0, i64::saturating_add);
        let total_used_cost = materials.iter().map(|m| m.used_cost).fold(0, i64::saturating_add);

        Self {
            project_id: project.id,
            code: project.code.clone(),
            name: project.name.clone(),
            status: project.status,
            budget: project.budget,
            total_estimated_cost,
            total_used_cost,
            material_usage_percent: percent(total_used_cost, total_estimated_cost),
            budget_remaining: project.budget.saturating_sub(total_used_cost),
            budget_usage_percent: percent(total_used_cost, project.budget),
            over_budget: total_used_cost > project.budget,
            materials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::tests::{material, project};
    use chrono::Utc;
    use kopontren_core::UserId;
    use proptest::prelude::*;

    #[test]
    fn percent_handles_zero_denominator() {
        assert_eq!(percent(5, 0), 0.0);
        assert_eq!(percent(1, 3), 33.33);
        assert_eq!(percent(3, 2), 150.0);
    }

    #[test]
    fn summary_math() {
        let mut p = project();
        let semen = p.add_material(material(100, 65_000), Utc::now()).unwrap();
        let pasir = p.add_material(material(10, 300_000), Utc::now()).unwrap();
        p.transition(ProjectStatus::InProgress, Utc::now()).unwrap();
        let today = Utc::now().date_naive();
        p.record_usage(semen, 40, 60_000, today, None, UserId::new(), Utc::now()).unwrap();
        p.record_usage(pasir, 12, 300_000, today, None, UserId::new(), Utc::now()).unwrap();

        let semen_product = p.material(semen).unwrap().product_id;
        let summary = ProjectSummary::build(&p, |id| if id == semen_product { 50 } else { 0 });

        let s = &summary.materials[0];
        assert_eq!(s.estimated_cost, 6_500_000);
        assert_eq!(s.used_cost, 2_400_000);
        assert_eq!(s.usage_percent, 40.0);
        assert_eq!(s.remaining_quantity, 60);
        assert_eq!(s.shortfall, 10);
        assert_eq!(s.over_usage, 0);

        let s = &summary.materials[1];
        assert_eq!(s.usage_percent, 120.0);
        assert_eq!(s.remaining_quantity, 0);
        assert_eq!(s.over_usage, 2);
        assert_eq!(s.shortfall, 0);

        assert_eq!(summary.total_estimated_cost, 9_500_000);
        assert_eq!(summary.total_used_cost, 6_000_000);
        assert_eq!(summary.budget_remaining, 4_000_000);
        assert_eq!(summary.budget_usage_percent, 60.0);
        assert!(!summary.over_budget);
    }

    #[test]
    fn empty_project_has_zero_percentages() {
        let mut p = project();
        p.budget = 0;
        let summary = ProjectSummary::build(&p, |_| 0);
        assert_eq!(summary.material_usage_percent, 0.0);
        assert_eq!(summary.budget_usage_percent, 0.0);
        assert!(!summary.over_budget);
    }

    #[test]
    fn cost_rollups_saturate_instead_of_overflowing() {
        let mut p = project();
        p.add_material(material(1, i64::MAX - 1), Utc::now()).unwrap();
        p.add_material(material(1, i64::MAX - 1), Utc::now()).unwrap();
        p.materials[0].used_cost = i64::MAX;
        p.materials[1].used_cost = i64::MAX;
        p.budget = 0;

        let summary = ProjectSummary::build(&p, |_| 0);
        assert_eq!(summary.total_estimated_cost, i64::MAX);
        assert_eq!(summary.total_used_cost, i64::MAX);
        assert_eq!(summary.budget_remaining, -i64::MAX);
        assert!(summary.over_budget);
    }

    proptest! {
        #[test]
        fn remaining_and_over_usage_split_the_estimate(est in 1i64..1_000, used in 1i64..2_000, stock in 0i64..1_000) {
            let mut p = project();
            let id = p.add_material(material(est, 1_000), Utc::now()).unwrap();
            p.transition(ProjectStatus::InProgress, Utc::now()).unwrap();
            p.record_usage(id, used, 1_000, Utc::now().date_naive(), None, UserId::new(), Utc::now()).unwrap();

            let summary = ProjectSummary::build(&p, |_| stock);
            let s = &summary.materials[0];
            prop_assert_eq!(s.remaining_quantity - s.over_usage, est - used);
            prop_assert!(s.remaining_quantity == 0 || s.over_usage == 0);
            prop_assert!(s.shortfall <= s.remaining_quantity);
            prop_assert_eq!(summary.total_used_cost, used * 1_000);
        }
    }
}
