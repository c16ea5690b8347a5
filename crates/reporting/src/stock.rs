use serde::Serialize;

use kopontren_products::{Product, ProductId};
use kopontren_projects::{Project, ProjectSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLine {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub stock: i64,
    pub min_stock: i64,
}

impl From<&Product> for StockLine {
    fn from(p: &Product) -> Self {
        Self {
            product_id: p.id,
            code: p.code.clone(),
            name: p.name.clone(),
            unit: p.unit.clone(),
            stock: p.stock,
            min_stock: p.min_stock,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockReport {
    pub product_count: u64,
    pub total_units: i64,
    pub value_at_cost: i64,
    pub value_at_price: i64,
    pub low_stock: Vec<StockLine>,
    pub out_of_stock: Vec<StockLine>,
}

/// Snapshot over active products. Out-of-stock products are not repeated in `low_stock`.
pub fn stock_report<'a>(products: impl IntoIterator<Item = &'a Product>) -> StockReport {
    let mut report = StockReport {
        product_count: 0,
        total_units: 0,
        value_at_cost: 0,
        value_at_price: 0,
        low_stock: Vec::new(),
        out_of_stock: Vec::new(),
    };
    for p in products.into_iter().filter(|p| p.is_active) {
        report.product_count += 1;
        report.total_units = report.total_units.saturating_add(p.stock);
        report.value_at_cost = report.value_at_cost.saturating_add(p.stock.saturating_mul(p.buy_price));
        report.value_at_price = report.value_at_price.saturating_add(p.stock.saturating_mul(p.sell_price));
        if p.stock <= 0 {
            report.out_of_stock.push(p.into());
        } else if p.is_low_stock() {
            report.low_stock.push(p.into());
        }
    }
    report.low_stock.sort_by(|a, b| a.name.cmp(&b.name));
    report.out_of_stock.sort_by(|a, b| a.name.cmp(&b.name));
    report
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectReport {
    pub projects: Vec<ProjectSummary>,
    pub total_budget: i64,
    pub total_used_cost: i64,
    pub over_budget_count: u64,
}

pub fn project_report<'a>(
    projects: impl IntoIterator<Item = &'a Project>,
    stock_of: impl Fn(ProductId) -> i64,
) -> ProjectReport {
    let projects: Vec<ProjectSummary> = projects
        .into_iter()
        .map(|p| ProjectSummary::build(p, &stock_of))
        .collect();
    ProjectReport {
        total_budget: projects.iter().map(|p| p.budget).fold(0, i64::saturating_add),
        total_used_cost: projects.iter().map(|p| p.total_used_cost).fold(0, i64::saturating_add),
        over_budget_count: projects.iter().filter(|p| p.over_budget).count() as u64,
        projects,
    }
}
