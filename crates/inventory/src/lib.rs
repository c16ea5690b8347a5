//! Inventory domain module.
//!
//! The append-only stock movement ledger, price history, and stock adjustments
//! (stock opname). Product stock is only ever changed through [`StockMovement::apply`].

pub mod adjustment;
pub mod movement;
pub mod price;

pub use adjustment::{AdjustmentMode, StockAdjustment};
pub use movement::{MovementType, ReferenceType, StockMovement, StockMovementId, StockReference};
pub use price::{PriceHistory, PriceHistoryId, PriceSource};
