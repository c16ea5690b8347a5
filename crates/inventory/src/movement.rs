use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kopontren_core::{DomainError, DomainResult, Entity, UserId, entity_id, error::positive};
use kopontren_products::{Product, ProductId};

entity_id! {
    /// Stock movement identifier.
    pub struct StockMovementId; "stock movement id"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Out,
}

/// What caused a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    Initial,
    Purchase,
    Sale,
    SaleVoid,
    Adjustment,
    Project,
}

/// Link from a movement back to the document that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReference {
    pub reference_type: ReferenceType,
    pub reference_id: Option<Uuid>,
    pub reference_number: Option<String>,
}

impl StockReference {
    pub fn new(reference_type: ReferenceType) -> Self {
        Self {
            reference_type,
            reference_id: None,
            reference_number: None,
        }
    }

    pub fn document(reference_type: ReferenceType, id: impl Into<Uuid>, number: impl Into<String>) -> Self {
        Self {
            reference_type,
            reference_id: Some(id.into()),
            reference_number: Some(number.into()),
        }
    }
}

/// Append-only ledger row. `new_stock = previous_stock ± quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: StockMovementId,
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub reference_type: ReferenceType,
    pub reference_id: Option<Uuid>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Entity for StockMovement {
    type Id = StockMovementId;

    fn id(&self) -> StockMovementId {
        self.id
    }
}

/// Stock after moving `quantity` units from `current`.
pub fn next_stock(current: i64, movement_type: MovementType, quantity: i64) -> DomainResult<i64> {
    positive("movement quantity", quantity)?;
    match movement_type {
        MovementType::In => current
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("stock would overflow")),
        MovementType::Out if quantity > current => Err(DomainError::validation(format!(
            "insufficient stock: {current} available, {quantity} requested"
        ))),
        MovementType::Out => Ok(current - quantity),
    }
}

impl StockMovement {
    /// Move the product's stock and return the ledger row describing it.
    ///
    /// On error the product is left untouched.
    pub fn apply(
        product: &mut Product,
        movement_type: MovementType,
        quantity: i64,
        reference: StockReference,
        notes: Option<String>,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let previous_stock = product.stock;
        let new_stock = next_stock(previous_stock, movement_type, quantity).map_err(|e| match e {
            DomainError::Validation(msg) => DomainError::validation(format!("{}: {msg}", product.name)),
            other => other,
        })?;
        product.set_stock(new_stock, now);

        Ok(Self {
            id: StockMovementId::new(),
            product_id: product.id,
            movement_type,
            quantity,
            previous_stock,
            new_stock,
            reference_type: reference.reference_type,
            reference_id: reference.reference_id,
            reference_number: reference.reference_number,
            notes,
            created_by,
            created_at: now,
        })
    }
}
