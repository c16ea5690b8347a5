//! Point-of-sale domain module.
//!
//! Checkout, BON (store credit) settlement and voiding of POS transactions.
//! Pure domain logic (no IO, no HTTP, no storage); stock effects are booked by the caller.

pub mod transaction;

pub use transaction::{
    Checkout, LineInput, Payment, PaymentStatus, PaymentType, Transaction, TransactionId,
    TransactionItem, TransactionStatus,
};
