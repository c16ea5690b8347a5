//! `kopontren-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, Principal, authorize};
pub use claims::{JwtClaims, TokenError, validate_claims};
pub use jwt::{Hs256Jwt, JwtValidator};
pub use password::PasswordError;
pub use permissions::{Permission, permissions_for};
pub use roles::Role;
pub use user::{NewUser, User, UserUpdate};
