//! Units of sale and their conversion to the product's base unit.
//!
//! Stock is always kept in base units. A product sold per `pcs` may also be bought per
//! `dus` (box) of 24; that box is a `ProductUnit { name: "dus", factor: 24 }`.

use serde::{Deserialize, Serialize};

use kopontren_core::{DomainError, DomainResult, error::{checked_mul, required_text}};

/// Alternative unit: `factor` base units make one of this unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUnit {
    pub name: String,
    pub factor: i64,
}

/// A quantity expressed in some unit, split into whole units and leftover base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Converted {
    pub quantity: i64,
    pub remainder_base: i64,
}

pub fn to_base(quantity: i64, factor: i64) -> DomainResult<i64> {
    ensure_factor(factor)?;
    checked_mul("converted quantity", quantity, factor)
}

pub fn from_base(base_quantity: i64, factor: i64) -> DomainResult<Converted> {
    ensure_factor(factor)?;
    Ok(Converted {
        quantity: base_quantity.div_euclid(factor),
        remainder_base: base_quantity.rem_euclid(factor),
    })
}

/// Convert `quantity` of the unit with `from_factor` into the unit with `to_factor`.
pub fn convert(quantity: i64, from_factor: i64, to_factor: i64) -> DomainResult<Converted> {
    from_base(to_base(quantity, from_factor)?, to_factor)
}

fn ensure_factor(factor: i64) -> DomainResult<()> {
    if factor <= 0 {
        return Err(DomainError::validation("unit factor must be positive"));
    }
    Ok(())
}

/// Validate a product's unit table against its base unit name.
///
/// Names are trimmed and compared case-insensitively; the base unit cannot be
/// redefined and factor 1 aliases are pointless, so both are rejected.
pub fn validate_units(base_unit: &str, units: Vec<ProductUnit>) -> DomainResult<Vec<ProductUnit>> {
    let mut seen: Vec<String> = vec![base_unit.to_lowercase()];
    let mut out = Vec::with_capacity(units.len());
    for unit in units {
        let name = required_text("unit name", &unit.name, 20)?;
        let key = name.to_lowercase();
        if seen.contains(&key) {
            return Err(DomainError::validation(format!("unit '{name}' is defined twice")));
        }
        if unit.factor <= 1 {
            return Err(DomainError::validation(format!(
                "unit '{name}' must hold more than one base unit"
            )));
        }
        seen.push(key);
        out.push(ProductUnit {
            name,
            factor: unit.factor,
        });
    }
    Ok(out)
}
