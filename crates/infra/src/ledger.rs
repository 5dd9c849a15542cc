//! Inventory ledger: the only writer of product stock.
//!
//! Every adjustment runs inside the caller's [`StorageTx`] on a locked
//! product row and never commits on its own.

use tracing::{debug, warn};

use sweetshop_core::{DomainError, ProductId};
use sweetshop_products::Product;

use crate::store::StorageTx;
use crate::storefront::StorefrontError;

pub struct InventoryLedger;

impl InventoryLedger {
    /// Lock a product row for the rest of the transaction.
    pub async fn lock(tx: &mut dyn StorageTx, product_id: ProductId) -> Result<Product, StorefrontError> {
        tx.lock_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("product").into())
    }

    /// Reserve `delta` units of an already locked product.
    ///
    /// Returns the product as it stands after the adjustment.
    pub async fn apply(
        tx: &mut dyn StorageTx,
        product: &Product,
        delta: i64,
    ) -> Result<Product, StorefrontError> {
        let reservation = sweetshop_inventory::reserve(product, delta).inspect_err(|e| {
            if let DomainError::OutOfStock { requested, available } = e {
                warn!(product_id = %product.id(), requested, available, "reservation rejected");
            }
        })?;

        if reservation.is_noop() {
            return Ok(product.clone());
        }

        tx.write_stock(product.id(), reservation.stock_after).await?;
        debug!(
            product_id = %product.id(),
            delta,
            stock_before = reservation.stock_before,
            stock_after = reservation.stock_after,
            "stock adjusted"
        );

        Ok(product.with_stock(reservation.stock_after)?)
    }

    /// Lock then reserve.
    pub async fn reserve(
        tx: &mut dyn StorageTx,
        product_id: ProductId,
        delta: i64,
    ) -> Result<Product, StorefrontError> {
        let product = Self::lock(tx, product_id).await?;
        Self::apply(tx, &product, delta).await
    }
}
