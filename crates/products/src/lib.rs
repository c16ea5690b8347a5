//! Product catalog: categories, products, barcodes and units.
//!
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod barcode;
pub mod category;
pub mod product;
pub mod unit;

pub use category::{Category, CategoryId, CategoryInput};
pub use product::{NewProduct, PriceChange, Product, ProductId, ProductUpdate};
pub use unit::{Converted, ProductUnit};
