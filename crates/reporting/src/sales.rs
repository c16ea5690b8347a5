use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use kopontren_products::ProductId;
use kopontren_sales::{PaymentType, Transaction};

use crate::range::DateRange;

pub const DEFAULT_TOP_N: usize = 10;
pub const MAX_TOP_N: usize = 100;

/// Completed (non-voided) transactions dated inside `range`.
pub(crate) fn completed_in<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    range: DateRange,
) -> impl Iterator<Item = &'a Transaction> {
    transactions
        .into_iter()
        .filter(move |t| t.is_completed() && range.contains(t.created_at.date_naive()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentBreakdown {
    pub payment_type: PaymentType,
    pub count: u64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub range: DateRange,
    pub transaction_count: u64,
    /// Before any discount.
    pub gross_sales: i64,
    pub discounts: i64,
    pub net_sales: i64,
    pub cost_of_goods: i64,
    pub gross_profit: i64,
    pub average_ticket: i64,
    pub by_payment_type: Vec<PaymentBreakdown>,
    pub outstanding_bon: i64,
}

pub fn sales_summary<'a>(transactions: impl IntoIterator<Item = &'a Transaction>, range: DateRange) -> SalesSummary {
    let mut count = 0u64;
    let (mut gross, mut discounts, mut net, mut cost, mut outstanding) = (0i64, 0i64, 0i64, 0i64, 0i64);
    let mut by_type: BTreeMap<PaymentType, (u64, i64)> = BTreeMap::new();

    for t in completed_in(transactions, range) {
        count += 1;
        let line_discounts = t.items.iter().map(|i| i.discount).fold(0, i64::saturating_add);
        gross = gross.saturating_add(t.subtotal.saturating_add(line_discounts));
        discounts = discounts.saturating_add(line_discounts.saturating_add(t.discount));
        net = net.saturating_add(t.total);
        cost = cost.saturating_add(t.cost_of_goods());
        outstanding = outstanding.saturating_add(t.outstanding());
        let entry = by_type.entry(t.payment_type).or_default();
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(t.total);
    }

    SalesSummary {
        range,
        transaction_count: count,
        gross_sales: gross,
        discounts,
        net_sales: net,
        cost_of_goods: cost,
        gross_profit: net.saturating_sub(cost),
        average_ticket: if count == 0 { 0 } else { net / count as i64 },
        by_payment_type: PaymentType::ALL
            .into_iter()
            .map(|payment_type| {
                let (count, total) = by_type.get(&payment_type).copied().unwrap_or_default();
                PaymentBreakdown { payment_type, count, total }
            })
            .collect(),
        outstanding_bon: outstanding,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopBy {
    #[default]
    Quantity,
    Revenue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub product_code: String,
    pub product_name: String,
    pub quantity: i64,
    pub revenue: i64,
}

/// Best sellers in `range`, ties broken by product name. `limit` defaults to 10, max 100.
pub fn top_products<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    range: DateRange,
    by: TopBy,
    limit: Option<usize>,
) -> Vec<TopProduct> {
    let limit = limit.unwrap_or(DEFAULT_TOP_N).clamp(1, MAX_TOP_N);
    let mut totals: BTreeMap<ProductId, TopProduct> = BTreeMap::new();
    for t in completed_in(transactions, range) {
        for item in &t.items {
            let row = totals.entry(item.product_id).or_insert_with(|| TopProduct {
                product_id: item.product_id,
                product_code: item.product_code.clone(),
                product_name: item.product_name.clone(),
                quantity: 0,
                revenue: 0,
            });
            row.quantity = row.quantity.saturating_add(item.quantity);
            row.revenue = row.revenue.saturating_add(item.subtotal);
        }
    }

    let key = |p: &TopProduct| match by {
        TopBy::Quantity => p.quantity,
        TopBy::Revenue => p.revenue,
    };
    let mut rows: Vec<TopProduct> = totals.into_values().collect();
    rows.sort_by(|a, b| key(b).cmp(&key(a)).then_with(|| a.product_name.cmp(&b.product_name)));
    rows.truncate(limit);
    rows
}
