//! Catalog seeding from a JSON file.
//!
//! ```json
//! { "products": [ { "name": "Fudge", "price": 499, "category": "Chocolate", "stock": 20 } ] }
//! ```
//!
//! Products are matched by name; entries whose name already exists are
//! skipped, so seeding is safe to repeat on every start.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use sweetshop_core::DomainError;
use sweetshop_products::NewProduct;

use crate::store::{Storage, StoreError};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid seed entry '{name}': {source}")]
    Invalid { name: String, source: DomainError },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogSeed {
    pub products: Vec<NewProduct>,
}

impl CatalogSeed {
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_json(&raw)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Insert every seed product whose name is not in the catalog yet.
pub async fn seed_catalog<S: Storage + ?Sized>(store: &S, seed: CatalogSeed) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    for entry in seed.products {
        if store.find_product_by_name(&entry.name).await?.is_some() {
            warn!(name = %entry.name, "product already exists, skipping");
            report.skipped += 1;
            continue;
        }

        let name = entry.name.clone();
        let product = entry
            .into_product()
            .map_err(|source| SeedError::Invalid { name, source })?;
        store.insert_product(&product).await?;
        info!(product_id = %product.id(), name = %product.name(), stock = product.stock(), "seeded product");
        report.inserted += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    const SEED: &str = r#"{
        "products": [
            { "name": "Fudge", "price": 499, "category": "Chocolate", "stock": 20 },
            { "name": "Gummy Bears", "price": 250, "category": "Gummies", "stock": 40,
              "image_url": "https://img.example/gummy.png" }
        ]
    }"#;

    #[tokio::test]
    async fn seeds_once_then_skips_by_name() {
        let store = InMemoryStore::default();

        let first = seed_catalog(&store, CatalogSeed::from_json(SEED).unwrap()).await.unwrap();
        assert_eq!(first, SeedReport { inserted: 2, skipped: 0 });

        let second = seed_catalog(&store, CatalogSeed::from_json(SEED).unwrap()).await.unwrap();
        assert_eq!(second, SeedReport { inserted: 0, skipped: 2 });

        assert_eq!(store.list_products().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_entry_is_reported_by_name() {
        let store = InMemoryStore::default();
        let seed = CatalogSeed::from_json(
            r#"{ "products": [ { "name": "Air", "price": 0, "category": "Nothing", "stock": 1 } ] }"#,
        )
        .unwrap();

        match seed_catalog(&store, seed).await {
            Err(SeedError::Invalid { name, .. }) => assert_eq!(name, "Air"),
            other => panic!("expected invalid entry, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            CatalogSeed::from_json("{ nope"),
            Err(SeedError::Parse(_))
        ));
    }
}
