use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use kopontren_auth::Principal;
use kopontren_core::{DomainError, Page, PageRequest};
use kopontren_inventory::{MovementType, PriceHistory, PriceSource, ReferenceType, StockMovement, StockReference};
use kopontren_products::{Product, ProductId};
use kopontren_purchasing::{
    LineInput, NewPurchaseOrder, PurchaseOrder, PurchaseOrderId, PurchaseOrderStatus, ReceiveOverride, order,
};
use kopontren_suppliers::{Supplier, SupplierId};

use super::{ServiceResult, Services, next_number, require};
use crate::audit::{self, AuditAction};
use crate::notify::{Notice, NotificationKind};
use crate::store::Tx;

/// One requested line. Without `unit_price` the product's current buy price is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PoLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatePurchaseOrder {
    pub supplier_id: SupplierId,
    /// Defaults to today (UTC).
    pub order_date: Option<NaiveDate>,
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub items: Vec<PoLine>,
}

/// Draft edit. `items`, when present, replaces every line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdatePurchaseOrder {
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub items: Option<Vec<PoLine>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<SupplierId>,
    /// Inclusive bounds on the order date.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Matches the number or supplier name.
    pub q: Option<String>,
}

impl PurchaseOrderFilter {
    fn matches(&self, po: &PurchaseOrder) -> bool {
        self.status.is_none_or(|s| po.status == s)
            && self.supplier_id.is_none_or(|s| po.supplier_id == s)
            && self.from.is_none_or(|d| po.order_date >= d)
            && self.to.is_none_or(|d| po.order_date <= d)
            && self.q.as_deref().is_none_or(|q| {
                let q = q.trim().to_lowercase();
                po.number.to_lowercase().contains(&q) || po.supplier_name.to_lowercase().contains(&q)
            })
    }
}

/// Resolve requested lines against the catalog: names, units and default prices.
fn resolve_lines(tx: &Tx, lines: Vec<PoLine>) -> ServiceResult<Vec<LineInput>> {
    lines
        .into_iter()
        .map(|line| {
            let product = require::<Product>(tx, line.product_id, "product")?;
            product.ensure_active()?;
            Ok(LineInput {
                product_id: product.id,
                product_name: product.name,
                unit: product.unit,
                quantity: line.quantity,
                unit_price: line.unit_price.unwrap_or(product.buy_price),
            })
        })
        .collect()
}

impl Services {
    pub async fn list_purchase_orders(&self, filter: &PurchaseOrderFilter, page: PageRequest) -> Page<PurchaseOrder> {
        self.store
            .read(|t| {
                let mut rows: Vec<PurchaseOrder> =
                    t.purchase_orders.values().filter(|po| filter.matches(po)).cloned().collect();
                rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.number.cmp(&a.number)));
                Page::from_vec(rows, page)
            })
            .await
    }

    pub async fn get_purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        self.store
            .read(|t| t.purchase_orders.get(&id).cloned())
            .await
            .ok_or_else(|| DomainError::not_found("purchase order").into())
    }

    /// Create a DRAFT order numbered `PO-YYYYMMDD-NNNN` for its order date.
    #[instrument(skip(self, actor, input), fields(actor = %actor.username), err)]
    pub async fn create_purchase_order(&self, actor: &Principal, input: CreatePurchaseOrder) -> ServiceResult<PurchaseOrder> {
        let now = Utc::now();
        let order_date = input.order_date.unwrap_or_else(|| now.date_naive());
        let po = self
            .store
            .write(|tx| -> ServiceResult<PurchaseOrder> {
                let supplier = require::<Supplier>(tx, input.supplier_id, "supplier")?;
                supplier.ensure_can_order()?;
                let lines = resolve_lines(tx, input.items)?;
                let number = next_number(
                    order::NUMBER_PREFIX,
                    order_date,
                    tx.tables().purchase_orders.values().map(|po| po.number.as_str()),
                );
                let po = PurchaseOrder::draft(
                    NewPurchaseOrder {
                        number,
                        supplier_id: supplier.id,
                        supplier_name: supplier.name,
                        order_date,
                        expected_date: input.expected_date,
                        notes: input.notes,
                        created_by: actor.user_id,
                    },
                    lines,
                    now,
                )?;
                audit::record(
                    tx,
                    actor,
                    AuditAction::Create,
                    "purchase_order",
                    Some(po.id.into()),
                    json!({ "number": po.number, "total_amount": po.total_amount }),
                    now,
                )?;
                tx.put(po.clone())?;
                Ok(po)
            })
            .await?;
        info!(number = %po.number, "purchase order drafted");
        Ok(po)
    }

    #[instrument(skip(self, actor, update), fields(actor = %actor.username), err)]
    pub async fn update_purchase_order(
        &self,
        actor: &Principal,
        id: PurchaseOrderId,
        update: UpdatePurchaseOrder,
    ) -> ServiceResult<PurchaseOrder> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<PurchaseOrder> {
                let mut po = require::<PurchaseOrder>(tx, id, "purchase order")?;
                po.update_notes(update.expected_date, update.notes, now)?;
                if let Some(items) = update.items {
                    let lines = resolve_lines(tx, items)?;
                    po.replace_items(lines, now)?;
                }
                audit::record(
                    tx,
                    actor,
                    AuditAction::Update,
                    "purchase_order",
                    Some(id.into()),
                    json!({ "number": po.number, "total_amount": po.total_amount }),
                    now,
                )?;
                tx.put(po.clone())?;
                Ok(po)
            })
            .await
    }

    #[instrument(skip(self, actor), fields(actor = %actor.username), err)]
    pub async fn send_purchase_order(&self, actor: &Principal, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<PurchaseOrder> {
                let mut po = require::<PurchaseOrder>(tx, id, "purchase order")?;
                po.send(now)?;
                audit::record(tx, actor, AuditAction::Send, "purchase_order", Some(id.into()), json!({ "number": po.number }), now)?;
                tx.put(po.clone())?;
                Ok(po)
            })
            .await
    }

    #[instrument(skip(self, actor, reason), fields(actor = %actor.username), err)]
    pub async fn cancel_purchase_order(
        &self,
        actor: &Principal,
        id: PurchaseOrderId,
        reason: Option<String>,
    ) -> ServiceResult<PurchaseOrder> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<PurchaseOrder> {
                let mut po = require::<PurchaseOrder>(tx, id, "purchase order")?;
                po.cancel(reason, now)?;
                audit::record(
                    tx,
                    actor,
                    AuditAction::Cancel,
                    "purchase_order",
                    Some(id.into()),
                    json!({ "number": po.number, "reason": po.cancel_reason }),
                    now,
                )?;
                tx.put(po.clone())?;
                Ok(po)
            })
            .await
    }

    /// Receive goods for a DRAFT or SENT order.
    ///
    /// In one write: every line with a positive received quantity gets an IN movement
    /// referencing the order, every line whose price differs from the product's buy
    /// price updates it and appends PURCHASE_ORDER price history, and the order flips
    /// to RECEIVED. Any failure leaves stock, prices, history and the order untouched.
    /// Administrators are notified after the write commits.
    #[instrument(skip(self, actor, overrides), fields(actor = %actor.username, po = %id), err)]
    pub async fn receive_purchase_order(
        &self,
        actor: &Principal,
        id: PurchaseOrderId,
        overrides: Vec<ReceiveOverride>,
    ) -> ServiceResult<PurchaseOrder> {
        let now = Utc::now();
        let po = self
            .store
            .write(|tx| -> ServiceResult<PurchaseOrder> {
                let mut po = require::<PurchaseOrder>(tx, id, "purchase order")?;
                let plan = po.receive_plan(&overrides)?;

                let mut price_changes = 0usize;
                for line in &plan {
                    let mut product = require::<Product>(tx, line.product_id, "product")?;
                    if line.quantity > 0 {
                        let movement = StockMovement::apply(
                            &mut product,
                            MovementType::In,
                            line.quantity,
                            StockReference::document(ReferenceType::Purchase, po.id, po.number.clone()),
                            None,
                            actor.user_id,
                            now,
                        )?;
                        tx.put(movement)?;
                        if let Some(change) = product.set_buy_price(line.unit_price, now)? {
                            tx.put(PriceHistory::record(
                                product.id,
                                change,
                                PriceSource::PurchaseOrder,
                                Some(po.id.into()),
                                actor.user_id,
                                now,
                            ))?;
                            price_changes += 1;
                        }
                        tx.put(product)?;
                    }
                }

                po.mark_received(&plan, actor.user_id, now)?;
                audit::record(
                    tx,
                    actor,
                    AuditAction::Receive,
                    "purchase_order",
                    Some(po.id.into()),
                    json!({
                        "number": po.number,
                        "lines": plan.iter().map(|l| json!({ "product_id": l.product_id, "quantity": l.quantity })).collect::<Vec<_>>(),
                        "price_changes": price_changes,
                    }),
                    now,
                )?;
                tx.put(po.clone())?;
                Ok(po)
            })
            .await?;

        info!(number = %po.number, "purchase order received");
        self.notify(Notice {
            kind: NotificationKind::PurchaseOrderReceived,
            title: "Purchase order received".to_string(),
            message: format!(
                "{} from {} was received by {}",
                po.number, po.supplier_name, actor.username
            ),
            reference_id: Some(po.id.into()),
        });
        Ok(po)
    }
}
