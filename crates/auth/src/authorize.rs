use thiserror::Error;

use kopontren_core::UserId;

use crate::{Permission, Role, permissions::permissions_for};

/// A fully resolved principal for authorization decisions.
///
/// Construction is decoupled from transport: the API derives it from verified claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn permissions(&self) -> Vec<Permission> {
        permissions_for(self.role)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal for a single permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions()
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{PURCHASES_RECEIVE, SALES_CREATE, USERS_MANAGE};

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: UserId::new(),
            username: "tester".into(),
            role,
        }
    }

    #[test]
    fn admin_wildcard_grants_everything() {
        assert!(authorize(&principal(Role::Admin), &USERS_MANAGE).is_ok());
        assert!(authorize(&principal(Role::Admin), &PURCHASES_RECEIVE).is_ok());
    }

    #[test]
    fn manager_cannot_manage_users() {
        let err = authorize(&principal(Role::Manager), &USERS_MANAGE).unwrap_err();
        assert_eq!(err, AuthzError::Forbidden("users.manage".into()));
    }

    #[test]
    fn cashier_can_sell_but_not_receive() {
        assert!(authorize(&principal(Role::Cashier), &SALES_CREATE).is_ok());
        assert!(authorize(&principal(Role::Cashier), &PURCHASES_RECEIVE).is_err());
    }
}
