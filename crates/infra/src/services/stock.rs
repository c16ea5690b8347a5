use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use kopontren_auth::Principal;
use kopontren_core::{Page, PageRequest};
use kopontren_inventory::{MovementType, PriceHistory, ReferenceType, StockAdjustment, StockMovement};
use kopontren_products::{Product, ProductId};

use super::{ServiceResult, Services, require};
use crate::audit::{self, AuditAction};
use crate::notify::{Notice, NotificationKind};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub movement_type: Option<MovementType>,
    pub reference_type: Option<ReferenceType>,
    /// Inclusive UTC dates.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl MovementFilter {
    fn matches(&self, m: &StockMovement) -> bool {
        let day = m.created_at.date_naive();
        self.product_id.is_none_or(|p| m.product_id == p)
            && self.movement_type.is_none_or(|t| m.movement_type == t)
            && self.reference_type.is_none_or(|t| m.reference_type == t)
            && self.from.is_none_or(|d| day >= d)
            && self.to.is_none_or(|d| day <= d)
    }
}

/// True when `movement` took `product` from above its minimum to at or below it.
pub(super) fn crossed_low_stock(movement: &StockMovement, product: &Product) -> bool {
    movement.movement_type == MovementType::Out
        && movement.previous_stock > product.min_stock
        && movement.new_stock <= product.min_stock
}

pub(super) fn low_stock_notice(product: &Product) -> Notice {
    Notice {
        kind: NotificationKind::LowStock,
        title: "Low stock".to_string(),
        message: format!(
            "{} ({}) is down to {} {} (minimum {})",
            product.name, product.code, product.stock, product.unit, product.min_stock
        ),
        reference_id: Some(product.id.into()),
    }
}

impl Services {
    pub(super) fn notify_low_stock(&self, products: &[Product]) {
        if !self.settings.low_stock_notify {
            return;
        }
        for p in products {
            self.notify(low_stock_notice(p));
        }
    }

    /// Manual correction or stock count. Reason is mandatory and kept on the movement.
    #[instrument(skip(self, actor, adjustment), fields(actor = %actor.username, product = %adjustment.product_id), err)]
    pub async fn adjust_stock(&self, actor: &Principal, adjustment: StockAdjustment) -> ServiceResult<StockMovement> {
        let now = Utc::now();
        let (movement, product) = self
            .store
            .write(|tx| -> ServiceResult<(StockMovement, Product)> {
                let mut product = require::<Product>(tx, adjustment.product_id, "product")?;
                let movement = adjustment.apply(&mut product, actor.user_id, now)?;
                audit::record(
                    tx,
                    actor,
                    AuditAction::Adjust,
                    "product",
                    Some(product.id.into()),
                    json!({
                        "mode": adjustment.mode,
                        "quantity": adjustment.quantity,
                        "previous_stock": movement.previous_stock,
                        "new_stock": movement.new_stock,
                        "reason": movement.notes,
                    }),
                    now,
                )?;
                tx.put(product.clone())?;
                tx.put(movement.clone())?;
                Ok((movement, product))
            })
            .await?;
        if crossed_low_stock(&movement, &product) {
            self.notify_low_stock(std::slice::from_ref(&product));
        }
        Ok(movement)
    }

    /// Ledger rows, newest first.
    pub async fn list_movements(&self, filter: &MovementFilter, page: PageRequest) -> Page<StockMovement> {
        self.store
            .read(|t| {
                let mut rows: Vec<StockMovement> =
                    t.stock_movements.values().filter(|m| filter.matches(m)).cloned().collect();
                rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
                Page::from_vec(rows, page)
            })
            .await
    }

    /// Price changes of one product, newest first.
    pub async fn price_history(&self, product_id: ProductId, page: PageRequest) -> ServiceResult<Page<PriceHistory>> {
        self.get_product(product_id).await?;
        Ok(self
            .store
            .read(|t| {
                let mut rows: Vec<PriceHistory> = t
                    .price_history
                    .values()
                    .filter(|h| h.product_id == product_id)
                    .cloned()
                    .collect();
                rows.sort_by(|a, b| b.changed_at.cmp(&a.changed_at).then(b.id.cmp(&a.id)));
                Page::from_vec(rows, page)
            })
            .await)
    }

    /// Active products at or below their minimum, emptiest first.
    pub async fn low_stock_products(&self) -> Vec<Product> {
        self.store
            .read(|t| {
                let mut rows: Vec<Product> = t
                    .products
                    .values()
                    .filter(|p| p.is_active && p.is_low_stock())
                    .cloned()
                    .collect();
                rows.sort_by(|a, b| (a.stock - a.min_stock).cmp(&(b.stock - b.min_stock)).then(a.name.cmp(&b.name)));
                rows
            })
            .await
    }
}
