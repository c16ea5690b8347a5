use chrono::Datelike;
use serde::Serialize;

use kopontren_projects::percent;
use kopontren_sales::Transaction;

use crate::range::DateRange;
use crate::sales::completed_in;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    /// `YYYY-MM`
    pub label: String,
    pub transaction_count: u64,
    pub total: i64,
    pub gross_profit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    pub range: DateRange,
    pub previous_range: DateRange,
    pub months: Vec<MonthBucket>,
    pub current_total: i64,
    pub previous_total: i64,
    pub change_percent: f64,
}

/// Percentage change from `previous` to `current`.
///
/// A rise from nothing counts as 100%; no activity in either period is 0%.
pub fn change_percent(current: i64, previous: i64) -> f64 {
    match (previous, current) {
        (0, 0) => 0.0,
        (0, c) if c > 0 => 100.0,
        (0, _) => -100.0,
        (p, c) => percent(c - p, p.abs()),
    }
}

/// Sales bucketed per calendar month in `range`, compared with `range.previous()`.
pub fn monthly_trend(transactions: &[Transaction], range: DateRange) -> MonthlyTrend {
    let mut months: Vec<MonthBucket> = range
        .months()
        .into_iter()
        .map(|(year, month)| MonthBucket {
            year,
            month,
            label: format!("{year:04}-{month:02}"),
            transaction_count: 0,
            total: 0,
            gross_profit: 0,
        })
        .collect();

    for t in completed_in(transactions, range) {
        let date = t.created_at.date_naive();
        if let Some(bucket) = months
            .iter_mut()
            .find(|b| b.year == date.year() && b.month == date.month())
        {
            bucket.transaction_count += 1;
            bucket.total = bucket.total.saturating_add(t.total);
            bucket.gross_profit = bucket.gross_profit.saturating_add(t.gross_profit());
        }
    }

    let previous_range = range.previous();
    let current_total = months.iter().map(|b| b.total).fold(0, i64::saturating_add);
    let previous_total = completed_in(transactions, previous_range).map(|t| t.total).fold(0, i64::saturating_add);

    MonthlyTrend {
        range,
        previous_range,
        months,
        current_total,
        previous_total,
        change_percent: change_percent(current_total, previous_total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sales::tests::{at, sale};
    use chrono::{Duration, NaiveDate};
    use kopontren_products::ProductId;
    use kopontren_sales::PaymentType;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn change_percent_rules() {
        assert_eq!(change_percent(150, 100), 50.0);
        assert_eq!(change_percent(50, 100), -50.0);
        assert_eq!(change_percent(10, 0), 100.0);
        assert_eq!(change_percent(0, 0), 0.0);
    }

    #[test]
    fn buckets_by_month_including_empty_ones() {
        let p = ProductId::new();
        let trx = vec![
            sale(at(2026, 1, 10), &[(p, "paku", 1, 100_000)], PaymentType::Cash),
            sale(at(2026, 1, 31), &[(p, "paku", 1, 50_000)], PaymentType::Cash),
            sale(at(2026, 3, 1), &[(p, "paku", 3, 100_000)], PaymentType::Cash),
            // previous period: 2025-10-03 ..= 2025-12-31
            sale(at(2025, 12, 15), &[(p, "paku", 2, 100_000)], PaymentType::Cash),
            sale(at(2025, 10, 2), &[(p, "paku", 9, 100_000)], PaymentType::Cash),
        ];
        let range = DateRange::new(d(2026, 1, 1), d(2026, 3, 31)).unwrap();
        let trend = monthly_trend(&trx, range);

        let labels: Vec<_> = trend.months.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, ["2026-01", "2026-02", "2026-03"]);
        assert_eq!(trend.months[0].total, 150_000);
        assert_eq!(trend.months[0].transaction_count, 2);
        assert_eq!(trend.months[1].total, 0);
        assert_eq!(trend.months[2].total, 300_000);

        assert_eq!(trend.previous_range.start, d(2025, 10, 3));
        assert_eq!(trend.current_total, 450_000);
        assert_eq!(trend.previous_total, 200_000);
        assert_eq!(trend.change_percent, 125.0);
    }

    proptest! {
        #[test]
        fn bucket_totals_add_up_to_range_total(
            offsets in prop::collection::vec((0i64..400, 1i64..20, 1i64..100_000), 0..40),
            span in 0i64..200,
        ) {
            let p = ProductId::new();
            let origin = at(2025, 6, 1);
            let trx: Vec<_> = offsets
                .iter()
                .map(|(day, qty, price)| sale(origin + Duration::days(*day), &[(p, "paku", *qty, *price)], PaymentType::Transfer))
                .collect();
            let start = d(2025, 9, 1);
            let range = DateRange::new(start, start + Duration::days(span)).unwrap();
            let trend = monthly_trend(&trx, range);

            let expected: i64 = trx
                .iter()
                .filter(|t| range.contains(t.created_at.date_naive()))
                .map(|t| t.total)
                .sum();
            prop_assert_eq!(trend.months.iter().map(|m| m.total).sum::<i64>(), expected);
            prop_assert_eq!(trend.current_total, expected);
        }
    }
}
