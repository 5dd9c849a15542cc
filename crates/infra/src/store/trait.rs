use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use sweetshop_cart::{Cart, CartLine, OwnedLine};
use sweetshop_core::{CartId, CartItemId, ProductId, UserId};
use sweetshop_orders::Order;
use sweetshop_products::Product;

/// Storage operation error.
///
/// These are **infrastructure errors** (locking, constraints, connectivity) as
/// opposed to domain errors (validation, stock, ownership).
///
/// ## Error Categories
///
/// - **Contention**: a lock could not be taken in time, a deadlock was broken or
///   a serialization check failed. The whole transaction was rolled back and
///   the caller may retry.
/// - **Integrity**: a stored row violates a schema constraint or cannot be
///   mapped back into a domain value.
/// - **Backend**: anything else (connectivity, pool exhaustion).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("contention: {0}")]
    Contention(String),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Read side of the storefront store plus the entry point for transactions.
///
/// Reads outside a transaction never take row locks and never create rows.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Open a unit of work. Dropping it without [`StorageTx::commit`] rolls
    /// every change back.
    async fn begin(&self) -> Result<Box<dyn StorageTx>, StoreError>;

    /// All products, ordered by name.
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, StoreError>;

    /// Catalog insertion (seeding only).
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;

    /// The user's cart, if one has been created.
    async fn load_cart(&self, user_id: UserId) -> Result<Option<Cart>, StoreError>;

    /// Orders newest first; every user's when `user_id` is `None`.
    async fn list_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>, StoreError>;
}

/// One all-or-nothing storage transaction.
///
/// Every stock decision is made on a row obtained through [`lock_product`],
/// which stays locked until commit or rollback. Lock order is product before
/// cart line.
///
/// [`lock_product`]: StorageTx::lock_product
#[async_trait]
pub trait StorageTx: Send {
    /// Lock and read a product row.
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn write_stock(&mut self, id: ProductId, stock: i64) -> Result<(), StoreError>;

    /// Idempotent cart creation keyed by user.
    async fn find_or_create_cart(&mut self, user_id: UserId) -> Result<CartId, StoreError>;

    /// Lock and read the cart's line for a product, if any.
    async fn find_line_for_product(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, StoreError>;

    /// Read a line and its owner without locking it.
    async fn peek_cart_line(&mut self, id: CartItemId) -> Result<Option<OwnedLine>, StoreError>;

    /// Lock and re-read a line and its owner.
    async fn lock_cart_line(&mut self, id: CartItemId) -> Result<Option<OwnedLine>, StoreError>;

    async fn insert_line(&mut self, line: &CartLine) -> Result<(), StoreError>;

    async fn update_line(&mut self, line: &CartLine) -> Result<(), StoreError>;

    async fn delete_line(&mut self, id: CartItemId) -> Result<(), StoreError>;

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> Storage for Arc<S>
where
    S: Storage + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn StorageTx>, StoreError> {
        (**self).begin().await
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list_products().await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).get_product(id).await
    }

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, StoreError> {
        (**self).find_product_by_name(name).await
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        (**self).insert_product(product).await
    }

    async fn load_cart(&self, user_id: UserId) -> Result<Option<Cart>, StoreError> {
        (**self).load_cart(user_id).await
    }

    async fn list_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>, StoreError> {
        (**self).list_orders(user_id).await
    }
}
