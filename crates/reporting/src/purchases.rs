use std::collections::BTreeMap;

use serde::Serialize;

use kopontren_purchasing::{PurchaseOrder, PurchaseOrderStatus};
use kopontren_suppliers::SupplierId;

use crate::range::DateRange;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: PurchaseOrderStatus,
    pub count: u64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierTotal {
    pub supplier_id: SupplierId,
    pub supplier_name: String,
    pub order_count: u64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseSummary {
    pub range: DateRange,
    pub order_count: u64,
    pub total_amount: i64,
    pub by_status: Vec<StatusCount>,
    pub by_supplier: Vec<SupplierTotal>,
}

/// Non-cancelled orders whose order date falls in `range`.
pub fn purchase_summary<'a>(orders: impl IntoIterator<Item = &'a PurchaseOrder>, range: DateRange) -> PurchaseSummary {
    let mut by_status: BTreeMap<&'static str, StatusCount> = BTreeMap::new();
    let mut by_supplier: BTreeMap<SupplierId, SupplierTotal> = BTreeMap::new();
    let (mut count, mut total) = (0u64, 0i64);

    for po in orders {
        if po.status == PurchaseOrderStatus::Cancelled || !range.contains(po.order_date) {
            continue;
        }
        count += 1;
        total = total.saturating_add(po.total_amount);

        let s = by_status.entry(po.status.as_str()).or_insert(StatusCount {
            status: po.status,
            count: 0,
            total: 0,
        });
        s.count += 1;
        s.total = s.total.saturating_add(po.total_amount);

        let sup = by_supplier.entry(po.supplier_id).or_insert_with(|| SupplierTotal {
            supplier_id: po.supplier_id,
            supplier_name: po.supplier_name.clone(),
            order_count: 0,
            total: 0,
        });
        sup.order_count += 1;
        sup.total = sup.total.saturating_add(po.total_amount);
    }

    let by_status = PurchaseOrderStatus::ALL
        .into_iter()
        .filter(|s| *s != PurchaseOrderStatus::Cancelled)
        .map(|status| {
            by_status.remove(status.as_str()).unwrap_or(StatusCount { status, count: 0, total: 0 })
        })
        .collect();

    let mut by_supplier: Vec<SupplierTotal> = by_supplier.into_values().collect();
    by_supplier.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.supplier_name.cmp(&b.supplier_name)));

    PurchaseSummary {
        range,
        order_count: count,
        total_amount: total,
        by_status,
        by_supplier,
    }
}

/// Value of goods received in `range` (received quantity at the PO line price).
pub fn received_value<'a>(orders: impl IntoIterator<Item = &'a PurchaseOrder>, range: DateRange) -> i64 {
    orders
        .into_iter()
        .filter(|po| {
            po.status == PurchaseOrderStatus::Received
                && po.received_at.is_some_and(|at| range.contains(at.date_naive()))
        })
        .flat_map(|po| po.items.iter())
        .map(|item| item.received_quantity.saturating_mul(item.unit_price))
        .fold(0, i64::saturating_add)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use kopontren_core::UserId;
    use kopontren_products::ProductId;
    use kopontren_purchasing::{LineInput, NewPurchaseOrder};

    pub(crate) fn po(supplier: SupplierId, name: &str, date: NaiveDate, qty: i64, price: i64) -> PurchaseOrder {
        PurchaseOrder::draft(
            NewPurchaseOrder {
                number: "PO-1".into(),
                supplier_id: supplier,
                supplier_name: name.into(),
                order_date: date,
                expected_date: None,
                notes: None,
                created_by: UserId::new(),
            },
            vec![LineInput {
                product_id: ProductId::new(),
                product_name: "Semen".into(),
                unit: "sak".into(),
                quantity: qty,
                unit_price: price,
            }],
            Utc::now(),
        )
        .unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    #[test]
    fn summary_skips_cancelled_and_sorts_suppliers_by_total() {
        let (a, b) = (SupplierId::new(), SupplierId::new());
        let mut cancelled = po(a, "TB Abadi", d(3), 100, 100);
        cancelled.cancel(None, Utc::now()).unwrap();
        let mut sent = po(b, "CV Bangun", d(4), 10, 60_000);
        sent.send(Utc::now()).unwrap();
        let orders = [po(a, "TB Abadi", d(2), 2, 1_000), sent, cancelled];

        let range = DateRange::new(d(1), d(31)).unwrap();
        let s = purchase_summary(&orders, range);
        assert_eq!(s.order_count, 2);
        assert_eq!(s.total_amount, 602_000);
        assert_eq!(s.by_supplier[0].supplier_name, "CV Bangun");
        assert_eq!(s.by_status.len(), 3);
        let draft = s.by_status.iter().find(|x| x.status == PurchaseOrderStatus::Draft).unwrap();
        assert_eq!(draft.count, 1);
    }

    #[test]
    fn received_value_uses_received_quantities() {
        let mut order = po(SupplierId::new(), "TB Abadi", d(2), 10, 1_000);
        let plan = order
            .receive_plan(&[kopontren_purchasing::ReceiveOverride {
                product_id: order.items[0].product_id,
                quantity: 7,
            }])
            .unwrap();
        order.mark_received(&plan, UserId::new(), Utc::now()).unwrap();
        let today = Utc::now().date_naive();
        assert_eq!(received_value([&order], DateRange::day(today)), 7_000);
    }
}
