//! API-side authorization guard.
//!
//! Handlers call [`require`] before touching any service, keeping the services and
//! domain crates free of role checks.

use kopontren_auth::{Permission, authorize};

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

/// Fail with 403 unless the caller's role grants `permission`.
pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), ApiError> {
    authorize(principal.principal(), permission).map_err(ApiError::from)
}
