use thiserror::Error;

use crate::{Identity, Permission, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Command-side authorization contract (checked at the request boundary).
///
/// The API layer enforces these requirements before invoking a storefront
/// operation.
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Role to permission policy.
///
/// Admins hold the wildcard. Shoppers may manage their own cart and place or
/// list their own orders. Browsing the catalog needs no token at all.
pub fn permissions_for(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![Permission::WILDCARD],
        Role::User => vec![
            Permission::CART_WRITE,
            Permission::ORDERS_PLACE,
            Permission::ORDERS_READ,
        ],
    }
}

/// Authorize an identity for a single permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(identity: &Identity, required: &Permission) -> Result<(), AuthzError> {
    let granted = permissions_for(identity.role);

    if granted.iter().any(|p| p.is_wildcard() || p == required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
