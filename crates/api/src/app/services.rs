//! Storage and storefront wiring.

use std::sync::Arc;

use thiserror::Error;

use sweetshop_infra::{
    CatalogSeed, InMemoryStore, PostgresStore, SeedError, Storage, StoreError, Storefront,
    seed_catalog,
};

use crate::config::{AppConfig, StoreConfig};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("storage setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("catalog seed failed: {0}")]
    Seed(#[from] SeedError),
}

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppServices {
    pub storefront: Storefront<Arc<dyn Storage>>,
}

impl AppServices {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self {
            storefront: Storefront::new(store),
        }
    }
}

/// Build the configured store, apply migrations and seed the catalog.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let store: Arc<dyn Storage> = match &config.store {
        StoreConfig::InMemory => {
            tracing::info!("using in-memory store");
            Arc::new(InMemoryStore::new(config.lock_timeout))
        }
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            tracing::info!(max_connections, "using postgres store");
            let store = PostgresStore::connect(database_url, *max_connections, config.lock_timeout).await?;
            store.migrate().await?;
            Arc::new(store)
        }
    };

    if let Some(path) = &config.seed_file {
        let seed = CatalogSeed::load(path).await?;
        let report = seed_catalog(store.as_ref(), seed).await?;
        tracing::info!(
            path = %path.display(),
            inserted = report.inserted,
            skipped = report.skipped,
            "catalog seeded"
        );
    }

    Ok(AppServices::new(store))
}
