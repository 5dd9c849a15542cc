//! Infrastructure layer: storage backends, inventory ledger, storefront
//! operations and catalog seeding.

pub mod ledger;
pub mod seed;
pub mod store;
pub mod storefront;


pub use ledger::InventoryLedger;
pub use seed::{CatalogSeed, SeedError, SeedReport, seed_catalog};
pub use store::{InMemoryStore, PostgresStore, Storage, StorageTx, StoreError};
pub use storefront::{RemovedLine, Storefront, StorefrontError};
