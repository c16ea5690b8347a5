use serde::Serialize;

use kopontren_projects::percent;
use kopontren_purchasing::PurchaseOrder;
use kopontren_sales::Transaction;

use crate::purchases::received_value;
use crate::range::DateRange;
use crate::sales::completed_in;
use crate::trend::change_percent;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialReport {
    pub range: DateRange,
    pub revenue: i64,
    pub cost_of_goods: i64,
    pub gross_profit: i64,
    pub margin_percent: f64,
    pub purchases_received: i64,
    /// Unpaid BON across all time, not just the range.
    pub outstanding_bon: i64,
    pub previous_revenue: i64,
    pub revenue_change_percent: f64,
}

pub fn financial_report(transactions: &[Transaction], orders: &[PurchaseOrder], range: DateRange) -> FinancialReport {
    let (revenue, cost_of_goods) = completed_in(transactions, range)
        .fold((0i64, 0i64), |(r, c), t| (r.saturating_add(t.total), c.saturating_add(t.cost_of_goods())));
    let previous_revenue = completed_in(transactions, range.previous()).map(|t| t.total).fold(0, i64::saturating_add);
    let gross_profit = revenue.saturating_sub(cost_of_goods);

    FinancialReport {
        range,
        revenue,
        cost_of_goods,
        gross_profit,
        margin_percent: percent(gross_profit, revenue),
        purchases_received: received_value(orders, range),
        outstanding_bon: transactions.iter().map(Transaction::outstanding).fold(0, i64::saturating_add),
        previous_revenue,
        revenue_change_percent: change_percent(revenue, previous_revenue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sales::tests::{at, sale};
    use chrono::NaiveDate;
    use kopontren_products::ProductId;
    use kopontren_sales::PaymentType;

    #[test]
    fn revenue_cost_margin_and_change() {
        let p = ProductId::new();
        let trx = vec![
            sale(at(2026, 3, 10), &[(p, "paku", 10, 10_000)], PaymentType::Cash),
            sale(at(2026, 3, 11), &[(p, "paku", 5, 10_000)], PaymentType::Bon),
            sale(at(2026, 2, 20), &[(p, "paku", 10, 10_000)], PaymentType::Cash),
        ];
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
        )
        .unwrap();
        let r = financial_report(&trx, &[], range);
        assert_eq!(r.revenue, 150_000);
        assert_eq!(r.cost_of_goods, 120_000);
        assert_eq!(r.gross_profit, 30_000);
        assert_eq!(r.margin_percent, 20.0);
        assert_eq!(r.outstanding_bon, 50_000);
        assert_eq!(r.previous_revenue, 100_000);
        assert_eq!(r.revenue_change_percent, 50.0);
        assert_eq!(r.purchases_received, 0);
    }
}
