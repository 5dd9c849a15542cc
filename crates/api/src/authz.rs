//! API-side authorization guard for storefront commands.
//!
//! This enforces authorization at the request boundary (before the storefront
//! operation runs), while keeping domain and infra crates auth-agnostic.

use sweetshop_auth::{AuthzError, CommandAuthorization, authorize};

use crate::context::PrincipalContext;

/// Check authorization for a command in the current request context.
///
/// This is intended to be called **before** invoking the storefront.
pub fn authorize_command<C: CommandAuthorization>(
    principal: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    for perm in command.required_permissions() {
        authorize(principal.identity(), perm)?;
    }

    Ok(())
}
