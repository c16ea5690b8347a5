use chrono::NaiveDate;
use serde::Serialize;

use kopontren_products::Product;
use kopontren_purchasing::PurchaseOrder;
use kopontren_sales::Transaction;

use crate::range::DateRange;
use crate::sales::completed_in;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub date: NaiveDate,
    pub today_sales: i64,
    pub today_transactions: u64,
    pub month_sales: i64,
    pub low_stock_count: u64,
    pub open_purchase_orders: u64,
    pub unpaid_bon_count: u64,
    pub unpaid_bon_amount: i64,
}

pub fn dashboard(
    today: NaiveDate,
    transactions: &[Transaction],
    products: &[Product],
    orders: &[PurchaseOrder],
) -> Dashboard {
    let (today_sales, today_transactions) = completed_in(transactions, DateRange::day(today))
        .fold((0i64, 0u64), |(s, n), t| (s.saturating_add(t.total), n + 1));
    let month_sales = completed_in(transactions, DateRange::month_to_date(today))
        .map(|t| t.total)
        .fold(0, i64::saturating_add);
    let unpaid: Vec<i64> = transactions
        .iter()
        .map(Transaction::outstanding)
        .filter(|o| *o > 0)
        .collect();

    Dashboard {
        date: today,
        today_sales,
        today_transactions,
        month_sales,
        low_stock_count: products.iter().filter(|p| p.is_active && p.is_low_stock()).count() as u64,
        open_purchase_orders: orders.iter().filter(|o| o.status.is_open()).count() as u64,
        unpaid_bon_count: unpaid.len() as u64,
        unpaid_bon_amount: unpaid.iter().copied().fold(0, i64::saturating_add),
    }
}
