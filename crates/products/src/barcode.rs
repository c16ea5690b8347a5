//! EAN barcode validation and in-store barcode generation.
//!
//! Products may carry a manufacturer EAN-13/EAN-8. Products without one get an
//! EAN-13 from the restricted-circulation range (prefix `20`), which never collides
//! with codes printed by manufacturers.

use rand::Rng;

use kopontren_core::{DomainError, DomainResult};

/// Prefix for barcodes generated in-store.
pub const INTERNAL_PREFIX: &str = "20";

/// Standard EAN check digit for the given payload digits (without the check digit).
///
/// Weights alternate 3,1,3,... starting from the rightmost payload digit.
pub fn check_digit(payload: &str) -> DomainResult<u8> {
    let mut sum = 0u32;
    for (i, c) in payload.chars().rev().enumerate() {
        let d = c
            .to_digit(10)
            .ok_or_else(|| DomainError::validation("barcode must contain digits only"))?;
        sum += if i % 2 == 0 { d * 3 } else { d };
    }
    Ok(((10 - (sum % 10)) % 10) as u8)
}

/// Validate an EAN-13 or EAN-8 barcode (length, digits, check digit).
pub fn validate(code: &str) -> DomainResult<()> {
    let code = code.trim();
    if code.len() != 13 && code.len() != 8 {
        return Err(DomainError::validation("barcode must be 8 or 13 digits"));
    }
    let (payload, check) = code.split_at(code.len() - 1);
    let expected = check_digit(payload)?;
    let actual = check
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .ok_or_else(|| DomainError::validation("barcode must contain digits only"))?;
    if expected as u32 != actual {
        return Err(DomainError::validation("barcode check digit is invalid"));
    }
    Ok(())
}

/// Build an in-store EAN-13 from a 10-digit body.
pub fn internal_from_body(body: u64) -> String {
    let payload = format!("{INTERNAL_PREFIX}{:010}", body % 10_000_000_000);
    // Payload is always 12 ASCII digits here.
    let check = check_digit(&payload).unwrap_or(0);
    format!("{payload}{check}")
}

/// Generate a random in-store EAN-13. Callers check uniqueness and retry.
pub fn generate_internal<R: Rng + ?Sized>(rng: &mut R) -> String {
    internal_from_body(rng.gen_range(0..10_000_000_000u64))
}
