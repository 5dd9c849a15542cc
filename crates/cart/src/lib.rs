//! Cart domain module.
//!
//! One cart per user, at most one line per product. Line prices are recomputed
//! from the product's current unit price on every mutation. Everything here is
//! pure: the storefront pairs these rules with inventory reservations inside a
//! storage transaction.

pub mod cart;

pub use cart::{Cart, CartLine, OwnedLine, Requantified};
