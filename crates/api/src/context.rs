use kopontren_auth::{Principal, Role};
use kopontren_core::UserId;

/// Principal context for a request (authenticated identity + role).
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }
}
