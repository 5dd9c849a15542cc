use serde::{Deserialize, Serialize};

use sweetshop_core::UserId;

use crate::Role;

/// Authenticated identity resolved from a bearer token.
///
/// This is the only thing the storefront knows about a caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
