//! Transactional storage boundary for the storefront.
//!
//! Two backends implement the same traits: an in-memory store for tests and
//! development, and a Postgres store for production.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{Storage, StorageTx, StoreError};
