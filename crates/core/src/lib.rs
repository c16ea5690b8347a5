//! `kopontren-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod numbering;
pub mod page;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::UserId;
pub use page::{Page, PageRequest};

#[doc(hidden)]
pub mod __private {
    pub use uuid::Uuid;
}
