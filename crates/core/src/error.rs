//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// state transitions, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, insufficient stock).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested transition is not allowed from the entity's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A requested resource was not found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness or reference constraint would be broken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authentication failure at the domain boundary.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound(entity)
    }
}

/// Trim a required text field, failing when it ends up empty or too long.
pub fn required_text(field: &str, value: &str, max_len: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Normalise an optional text field: blank strings become `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Fail unless `value >= 0`.
pub fn non_negative(field: &str, value: i64) -> DomainResult<i64> {
    if value < 0 {
        return Err(DomainError::validation(format!("{field} must not be negative")));
    }
    Ok(value)
}

/// Fail unless `value > 0`.
pub fn positive(field: &str, value: i64) -> DomainResult<i64> {
    if value <= 0 {
        return Err(DomainError::validation(format!("{field} must be positive")));
    }
    Ok(value)
}

/// `a * b` as a validation error on overflow.
pub fn checked_mul(field: &str, a: i64, b: i64) -> DomainResult<i64> {
    a.checked_mul(b)
        .ok_or_else(|| DomainError::validation(format!("{field} is too large")))
}

/// `a + b` as a validation error on overflow.
pub fn checked_add(field: &str, a: i64, b: i64) -> DomainResult<i64> {
    a.checked_add(b)
        .ok_or_else(|| DomainError::validation(format!("{field} is too large")))
}
