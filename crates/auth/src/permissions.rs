use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "cart.write").
/// The wildcard permission `"*"` grants everything and is reserved for admins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission::from_static("*");
    pub const CART_WRITE: Permission = Permission::from_static("cart.write");
    pub const ORDERS_PLACE: Permission = Permission::from_static("orders.place");
    pub const ORDERS_READ: Permission = Permission::from_static("orders.read");
    pub const ORDERS_READ_ALL: Permission = Permission::from_static("admin.orders.read");
    pub const INVENTORY_RESTOCK: Permission = Permission::from_static("admin.inventory.restock");

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
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
