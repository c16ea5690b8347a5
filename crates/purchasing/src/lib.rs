//! Purchasing domain module.
//!
//! Purchase orders and the receive plan that drives stock and price bookkeeping.
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod order;

pub use order::{
    LineInput, NewPurchaseOrder, PurchaseOrder, PurchaseOrderId, PurchaseOrderItem,
    PurchaseOrderStatus, ReceiptLine, ReceiveOverride,
};
