//! `sweetshop-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error taxonomy and the money/quantity value types
//! shared by the catalog, cart and order modules.

pub mod error;
pub mod id;
pub mod money;
pub mod quantity;

pub use error::{DomainError, DomainResult};
pub use id::{CartId, CartItemId, OrderId, OrderLineId, ProductId, UserId};
pub use money::Money;
pub use quantity::Quantity;
