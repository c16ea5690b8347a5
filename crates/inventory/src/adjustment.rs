use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kopontren_core::{
    DomainError, DomainResult, UserId,
    error::{non_negative, positive, required_text},
};
use kopontren_products::{Product, ProductId};

use crate::movement::{MovementType, ReferenceType, StockMovement, StockReference};

/// How the adjustment quantity is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentMode {
    /// Add `quantity` units.
    Add,
    /// Remove `quantity` units.
    Subtract,
    /// `quantity` is the counted stock (stock opname).
    Set,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub mode: AdjustmentMode,
    pub quantity: i64,
    pub reason: String,
}

impl StockAdjustment {
    /// The movement needed to bring `current` in line with this adjustment.
    pub fn movement_for(&self, current: i64) -> DomainResult<(MovementType, i64)> {
        match self.mode {
            AdjustmentMode::Add => Ok((MovementType::In, positive("quantity", self.quantity)?)),
            AdjustmentMode::Subtract => Ok((MovementType::Out, positive("quantity", self.quantity)?)),
            AdjustmentMode::Set => {
                let counted = non_negative("counted quantity", self.quantity)?;
                match counted.cmp(&current) {
                    std::cmp::Ordering::Equal => Err(DomainError::validation(
                        "counted quantity equals current stock, nothing to adjust",
                    )),
                    std::cmp::Ordering::Greater => Ok((MovementType::In, counted - current)),
                    std::cmp::Ordering::Less => Ok((MovementType::Out, current - counted)),
                }
            }
        }
    }

    pub fn apply(&self, product: &mut Product, by: UserId, now: DateTime<Utc>) -> DomainResult<StockMovement> {
        let reason = required_text("reason", &self.reason, 500)?;
        let (movement_type, quantity) = self.movement_for(product.stock)?;
        StockMovement::apply(
            product,
            movement_type,
            quantity,
            StockReference::new(ReferenceType::Adjustment),
            Some(reason),
            by,
            now,
        )
    }
}
