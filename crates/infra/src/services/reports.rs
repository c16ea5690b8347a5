//! Read-only reports over one consistent snapshot of the store.

use chrono::NaiveDate;

use kopontren_products::Product;
use kopontren_purchasing::PurchaseOrder;
use kopontren_reporting::{
    Dashboard, DateRange, FinancialReport, MonthlyTrend, ProjectReport, PurchaseSummary, SalesSummary, StockReport,
    TopBy, TopProduct,
};
use kopontren_sales::Transaction;

use super::Services;
use crate::store::Tables;

fn transactions(t: &Tables) -> Vec<Transaction> {
    t.transactions.values().cloned().collect()
}

fn orders(t: &Tables) -> Vec<PurchaseOrder> {
    t.purchase_orders.values().cloned().collect()
}

impl Services {
    pub async fn sales_summary(&self, range: DateRange) -> SalesSummary {
        self.store
            .read(|t| kopontren_reporting::sales_summary(t.transactions.values(), range))
            .await
    }

    pub async fn sales_trend(&self, range: DateRange) -> MonthlyTrend {
        let rows = self.store.read(transactions).await;
        kopontren_reporting::monthly_trend(&rows, range)
    }

    pub async fn top_products(&self, range: DateRange, by: TopBy, limit: Option<usize>) -> Vec<TopProduct> {
        self.store
            .read(|t| kopontren_reporting::top_products(t.transactions.values(), range, by, limit))
            .await
    }

    pub async fn purchase_summary(&self, range: DateRange) -> PurchaseSummary {
        self.store
            .read(|t| kopontren_reporting::purchase_summary(t.purchase_orders.values(), range))
            .await
    }

    pub async fn financial_report(&self, range: DateRange) -> FinancialReport {
        let (sales, purchases) = self.store.read(|t| (transactions(t), orders(t))).await;
        kopontren_reporting::financial_report(&sales, &purchases, range)
    }

    pub async fn stock_report(&self) -> StockReport {
        self.store
            .read(|t| kopontren_reporting::stock_report(t.products.values()))
            .await
    }

    pub async fn project_report(&self) -> ProjectReport {
        self.store
            .read(|t| {
                kopontren_reporting::project_report(t.projects.values(), |id| {
                    t.products.get(&id).map(|p| p.stock).unwrap_or(0)
                })
            })
            .await
    }

    pub async fn dashboard(&self, today: NaiveDate) -> Dashboard {
        let snapshot = self.store.snapshot().await;
        let products: Vec<Product> = snapshot.products.values().cloned().collect();
        kopontren_reporting::dashboard(today, &transactions(&snapshot), &products, &orders(&snapshot))
    }
}
