//! Reporting: pure aggregations over sales, purchasing, stock and projects.
//!
//! Every function takes the rows it aggregates plus an explicit [`DateRange`]; dates
//! are calendar days of the record's UTC timestamp.

pub mod dashboard;
pub mod financial;
pub mod purchases;
pub mod range;
pub mod sales;
pub mod stock;
pub mod trend;

pub use dashboard::{Dashboard, dashboard};
pub use financial::{FinancialReport, financial_report};
pub use purchases::{PurchaseSummary, purchase_summary};
pub use range::DateRange;
pub use sales::{SalesSummary, TopBy, TopProduct, sales_summary, top_products};
pub use stock::{ProjectReport, StockReport, project_report, stock_report};
pub use trend::{MonthBucket, MonthlyTrend, change_percent, monthly_trend};
