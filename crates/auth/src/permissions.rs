use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "products.read").
/// A special wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const ALL: Permission = Permission::from_static("*");

pub const USERS_MANAGE: Permission = Permission::from_static("users.manage");
pub const AUDIT_READ: Permission = Permission::from_static("audit.read");

pub const CATALOG_READ: Permission = Permission::from_static("catalog.read");
pub const CATALOG_WRITE: Permission = Permission::from_static("catalog.write");

pub const SUPPLIERS_READ: Permission = Permission::from_static("suppliers.read");
pub const SUPPLIERS_WRITE: Permission = Permission::from_static("suppliers.write");

pub const PURCHASES_READ: Permission = Permission::from_static("purchases.read");
pub const PURCHASES_WRITE: Permission = Permission::from_static("purchases.write");
pub const PURCHASES_RECEIVE: Permission = Permission::from_static("purchases.receive");

pub const STOCK_READ: Permission = Permission::from_static("stock.read");
pub const STOCK_ADJUST: Permission = Permission::from_static("stock.adjust");

pub const SALES_CREATE: Permission = Permission::from_static("sales.create");
pub const SALES_READ: Permission = Permission::from_static("sales.read");
pub const SALES_PAY: Permission = Permission::from_static("sales.pay");
pub const SALES_VOID: Permission = Permission::from_static("sales.void");

pub const PROJECTS_READ: Permission = Permission::from_static("projects.read");
pub const PROJECTS_WRITE: Permission = Permission::from_static("projects.write");

pub const REPORTS_READ: Permission = Permission::from_static("reports.read");

/// Static role → permission policy.
pub fn permissions_for(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![ALL],
        Role::Manager => vec![
            CATALOG_READ,
            CATALOG_WRITE,
            SUPPLIERS_READ,
            SUPPLIERS_WRITE,
            PURCHASES_READ,
            PURCHASES_WRITE,
            PURCHASES_RECEIVE,
            STOCK_READ,
            STOCK_ADJUST,
            SALES_READ,
            SALES_PAY,
            SALES_VOID,
            PROJECTS_READ,
            PROJECTS_WRITE,
            REPORTS_READ,
        ],
        Role::Cashier => vec![CATALOG_READ, SALES_CREATE, SALES_READ, SALES_PAY],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_gets_wildcard_only() {
        let perms = permissions_for(Role::Admin);
        assert_eq!(perms.len(), 1);
        assert!(perms[0].is_wildcard());
    }

    #[test]
    fn cashier_cannot_receive_or_void() {
        let perms = permissions_for(Role::Cashier);
        assert!(perms.contains(&SALES_CREATE));
        assert!(!perms.contains(&PURCHASES_RECEIVE));
        assert!(!perms.contains(&SALES_VOID));
    }
}
