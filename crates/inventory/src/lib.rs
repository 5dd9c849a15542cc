//! Inventory domain module.
//!
//! This crate contains the stock-ledger rule, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Storage backends
//! apply the resulting stock level inside their own transaction.

pub mod ledger;

pub use ledger::{Reservation, reserve};
