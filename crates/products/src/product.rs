use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kopontren_core::{
    DomainError, DomainResult, Entity, entity_id,
    error::{non_negative, optional_text, required_text},
};

use crate::barcode;
use crate::category::CategoryId;
use crate::unit::{ProductUnit, validate_units};

entity_id! {
    /// Product identifier.
    pub struct ProductId; "product id"
}

/// Catalog product. Prices are whole rupiah, stock is in base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub code: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    /// Base unit name, e.g. "pcs", "sak", "batang".
    pub unit: String,
    pub units: Vec<ProductUnit>,
    pub buy_price: i64,
    pub sell_price: i64,
    pub stock: i64,
    pub min_stock: i64,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProduct {
    pub code: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub unit: String,
    #[serde(default)]
    pub units: Vec<ProductUnit>,
    pub buy_price: i64,
    pub sell_price: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub initial_stock: i64,
}

/// Partial update. `None` leaves the field untouched.
///
/// `category_id: Some(None)` clears the category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductUpdate {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "double_option")]
    pub category_id: Option<Option<CategoryId>>,
    pub unit: Option<String>,
    pub units: Option<Vec<ProductUnit>>,
    pub buy_price: Option<i64>,
    pub sell_price: Option<i64>,
    pub min_stock: Option<i64>,
}

/// A buy and/or sell price change, produced whenever either price moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    pub old_buy_price: i64,
    pub new_buy_price: i64,
    pub old_sell_price: i64,
    pub new_sell_price: i64,
}

fn normalize_code(code: &str) -> DomainResult<String> {
    let code = required_text("product code", code, 32)?.to_uppercase();
    if code.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("product code must not contain spaces"));
    }
    Ok(code)
}

impl Product {
    /// Create a product with zero stock.
    ///
    /// `NewProduct::initial_stock` is booked separately as an opening stock movement so
    /// that stock only ever changes through the movement ledger.
    pub fn create(input: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        let unit = required_text("unit", &input.unit, 20)?;
        let barcode = match optional_text(input.barcode) {
            Some(code) => {
                barcode::validate(&code)?;
                Some(code)
            }
            None => None,
        };
        non_negative("initial stock", input.initial_stock)?;

        Ok(Self {
            id: ProductId::new(),
            code: normalize_code(&input.code)?,
            barcode,
            name: required_text("product name", &input.name, 120)?,
            description: optional_text(input.description),
            category_id: input.category_id,
            units: validate_units(&unit, input.units)?,
            unit,
            buy_price: non_negative("buy price", input.buy_price)?,
            sell_price: non_negative("sell price", input.sell_price)?,
            stock: 0,
            min_stock: non_negative("minimum stock", input.min_stock)?,
            image: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update; returns the price change if either price moved.
    pub fn apply_update(&mut self, update: ProductUpdate, now: DateTime<Utc>) -> DomainResult<Option<PriceChange>> {
        let mut next = self.clone();
        if let Some(code) = update.code {
            next.code = normalize_code(&code)?;
        }
        if let Some(name) = update.name {
            next.name = required_text("product name", &name, 120)?;
        }
        if let Some(description) = update.description {
            next.description = optional_text(Some(description));
        }
        if let Some(category_id) = update.category_id {
            next.category_id = category_id;
        }
        if let Some(unit) = update.unit {
            next.unit = required_text("unit", &unit, 20)?;
        }
        let units = update.units.unwrap_or_else(|| next.units.clone());
        next.units = validate_units(&next.unit, units)?;
        if let Some(price) = update.buy_price {
            next.buy_price = non_negative("buy price", price)?;
        }
        if let Some(price) = update.sell_price {
            next.sell_price = non_negative("sell price", price)?;
        }
        if let Some(min) = update.min_stock {
            next.min_stock = non_negative("minimum stock", min)?;
        }
        next.updated_at = now;

        let change = self.price_change_to(next.buy_price, next.sell_price);
        *self = next;
        Ok(change)
    }

    /// Replace the buy price (goods receipt); the sell price is left alone.
    pub fn set_buy_price(&mut self, price: i64, now: DateTime<Utc>) -> DomainResult<Option<PriceChange>> {
        non_negative("buy price", price)?;
        let change = self.price_change_to(price, self.sell_price);
        if change.is_some() {
            self.buy_price = price;
            self.updated_at = now;
        }
        Ok(change)
    }

    fn price_change_to(&self, buy: i64, sell: i64) -> Option<PriceChange> {
        if buy == self.buy_price && sell == self.sell_price {
            return None;
        }
        Some(PriceChange {
            old_buy_price: self.buy_price,
            new_buy_price: buy,
            old_sell_price: self.sell_price,
            new_sell_price: sell,
        })
    }

    /// Stock is written only by the movement ledger, with the movement's `new_stock`.
    pub fn set_stock(&mut self, stock: i64, now: DateTime<Utc>) {
        self.stock = stock;
        self.updated_at = now;
    }

    pub fn set_barcode(&mut self, code: String, now: DateTime<Utc>) -> DomainResult<()> {
        barcode::validate(&code)?;
        self.barcode = Some(code);
        self.updated_at = now;
        Ok(())
    }

    /// Replace the image path; returns the previous one so the caller can delete the file.
    pub fn set_image(&mut self, path: String, now: DateTime<Utc>) -> Option<String> {
        self.updated_at = now;
        self.image.replace(path)
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    pub fn ensure_active(&self) -> DomainResult<()> {
        if !self.is_active {
            return Err(DomainError::invalid_state(format!(
                "product {} is inactive",
                self.code
            )));
        }
        Ok(())
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Base units per `unit`; the base unit itself is factor 1.
    pub fn unit_factor(&self, unit: &str) -> DomainResult<i64> {
        let unit = unit.trim();
        if unit.eq_ignore_ascii_case(&self.unit) {
            return Ok(1);
        }
        self.units
            .iter()
            .find(|u| u.name.eq_ignore_ascii_case(unit))
            .map(|u| u.factor)
            .ok_or_else(|| {
                DomainError::validation(format!("product {} has no unit '{unit}'", self.code))
            })
    }

    /// Case-insensitive match on code, name or barcode.
    pub fn matches_search(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        q.is_empty()
            || self.code.to_lowercase().contains(&q)
            || self.name.to_lowercase().contains(&q)
            || self.barcode.as_deref().is_some_and(|b| b.contains(&q))
    }
}

/// Distinguishes an absent field from an explicit `null` in JSON updates.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
