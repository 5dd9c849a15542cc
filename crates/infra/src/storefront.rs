//! Storefront operations (application-level orchestration).
//!
//! Each mutating operation is one all-or-nothing storage transaction that
//! pairs a cart or order write with an inventory reservation:
//!
//! ```text
//! request
//!   ↓
//! 1. Validate input (quantity ≥ 1) before touching storage
//!   ↓
//! 2. Begin transaction
//!   ↓
//! 3. Lock product row (then cart line, never the other way round)
//!   ↓
//! 4. Decide (pure domain rules: ownership, stock, pricing)
//!   ↓
//! 5. Write stock + cart/order rows
//!   ↓
//! 6. Commit (any earlier failure drops the transaction and rolls back)
//! ```
//!
//! There are no automatic retries. A [`StorefrontError::Conflict`] tells the
//! caller that the same request may be retried.

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use sweetshop_cart::{Cart, CartLine};
use sweetshop_core::{CartItemId, DomainError, ProductId, Quantity, UserId};
use sweetshop_orders::Order;
use sweetshop_products::Product;

use crate::ledger::InventoryLedger;
use crate::store::{Storage, StoreError};

/// Error returned by storefront operations.
///
/// Flattens domain and storage failures into one taxonomy the API layer maps
/// onto status codes.
#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid quantity {0}: must be at least 1")]
    InvalidQuantity(i64),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("forbidden")]
    Forbidden,

    #[error("out of stock: requested {requested}, available {available}")]
    OutOfStock { requested: i64, available: i64 },

    /// Retryable: lock timeout, deadlock or serialization failure.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Store(StoreError),
}

impl StorefrontError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorefrontError::Conflict(_))
    }
}

impl From<StoreError> for StorefrontError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Contention(msg) => StorefrontError::Conflict(msg),
            other => StorefrontError::Store(other),
        }
    }
}

impl From<DomainError> for StorefrontError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => StorefrontError::Validation(msg),
            DomainError::InvalidId(msg) => StorefrontError::Validation(msg),
            DomainError::InvariantViolation(msg) => StorefrontError::InvariantViolation(msg),
            DomainError::NotFound(entity) => StorefrontError::NotFound(entity),
            DomainError::Forbidden => StorefrontError::Forbidden,
            DomainError::InvalidQuantity(n) => StorefrontError::InvalidQuantity(n),
            DomainError::OutOfStock {
                requested,
                available,
            } => StorefrontError::OutOfStock {
                requested,
                available,
            },
            DomainError::Conflict(msg) => StorefrontError::Conflict(msg),
            DomainError::Unauthorized => StorefrontError::Unauthorized,
        }
    }
}

/// A removed cart line and the stock it gave back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedLine {
    pub line: CartLine,
    pub returned_stock: i64,
}

/// Cart, order and inventory operations over a [`Storage`] backend.
#[derive(Debug, Clone)]
pub struct Storefront<S> {
    store: S,
}

impl<S> Storefront<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> Storefront<S>
where
    S: Storage,
{
    /// Reserve `quantity` units and put them in the user's cart, merging into
    /// an existing line for the same product.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id), err)]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartLine, StorefrontError> {
        let quantity = Quantity::new(quantity)?;

        let mut tx = self.store.begin().await?;

        let product = InventoryLedger::reserve(tx.as_mut(), product_id, quantity.get()).await?;
        let cart_id = tx.find_or_create_cart(user_id).await?;

        let line = match tx.find_line_for_product(cart_id, product_id).await? {
            Some(existing) => {
                let merged = existing.merged(&product, quantity)?;
                tx.update_line(&merged).await?;
                merged
            }
            None => {
                let line = CartLine::new(cart_id, &product, quantity)?;
                tx.insert_line(&line).await?;
                line
            }
        };

        tx.commit().await?;

        info!(
            cart_item_id = %line.id,
            quantity = line.quantity.get(),
            stock_after = product.stock(),
            "added to cart"
        );
        Ok(line)
    }

    /// Set a cart line to an absolute quantity, reserving or returning the
    /// difference.
    #[instrument(skip(self), fields(user_id = %user_id, cart_item_id = %cart_item_id), err)]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        cart_item_id: CartItemId,
        new_quantity: i64,
    ) -> Result<CartLine, StorefrontError> {
        let quantity = Quantity::new(new_quantity)?;

        let mut tx = self.store.begin().await?;

        let peeked = tx
            .peek_cart_line(cart_item_id)
            .await?
            .ok_or(DomainError::not_found("cart item"))?;
        peeked.ensure_owned_by(user_id)?;

        let product = InventoryLedger::lock(tx.as_mut(), peeked.line.product_id).await?;
        let owned = tx
            .lock_cart_line(cart_item_id)
            .await?
            .ok_or(DomainError::not_found("cart item"))?;
        owned.ensure_owned_by(user_id)?;

        let change = owned.line.requantified(&product, quantity)?;
        let product = InventoryLedger::apply(tx.as_mut(), &product, change.diff).await?;
        tx.update_line(&change.line).await?;

        tx.commit().await?;

        info!(
            diff = change.diff,
            quantity = change.line.quantity.get(),
            stock_after = product.stock(),
            "cart quantity updated"
        );
        Ok(change.line)
    }

    /// Delete a cart line and return its quantity to stock.
    #[instrument(skip(self), fields(user_id = %user_id, cart_item_id = %cart_item_id), err)]
    pub async fn remove_from_cart(
        &self,
        user_id: UserId,
        cart_item_id: CartItemId,
    ) -> Result<RemovedLine, StorefrontError> {
        let mut tx = self.store.begin().await?;

        let peeked = tx
            .peek_cart_line(cart_item_id)
            .await?
            .ok_or(DomainError::not_found("cart item"))?;
        peeked.ensure_owned_by(user_id)?;

        let product = InventoryLedger::lock(tx.as_mut(), peeked.line.product_id).await?;
        let owned = tx
            .lock_cart_line(cart_item_id)
            .await?
            .ok_or(DomainError::not_found("cart item"))?;
        owned.ensure_owned_by(user_id)?;

        let returned_stock = owned.line.quantity.get();
        let product = InventoryLedger::apply(tx.as_mut(), &product, -returned_stock).await?;
        tx.delete_line(cart_item_id).await?;

        tx.commit().await?;

        info!(returned_stock, stock_after = product.stock(), "removed from cart");
        Ok(RemovedLine {
            line: owned.line,
            returned_stock,
        })
    }

    /// Buy now: create a pending order for one product and reserve its stock.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id), err)]
    pub async fn place_order(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Order, StorefrontError> {
        let quantity = Quantity::new(quantity)?;

        let mut tx = self.store.begin().await?;

        let product = InventoryLedger::lock(tx.as_mut(), product_id).await?;
        let order = Order::place(user_id, &product, quantity, Utc::now())?;
        let product = InventoryLedger::apply(tx.as_mut(), &product, quantity.get()).await?;
        tx.insert_order(&order).await?;

        tx.commit().await?;

        info!(
            order_id = %order.id,
            total = order.total.minor_units(),
            stock_after = product.stock(),
            "order placed"
        );
        Ok(order)
    }

    /// Return `quantity` units to a product's stock (admin console).
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn restock(&self, product_id: ProductId, quantity: i64) -> Result<Product, StorefrontError> {
        let quantity = Quantity::new(quantity)?;

        let mut tx = self.store.begin().await?;
        let product = InventoryLedger::reserve(tx.as_mut(), product_id, -quantity.get()).await?;
        tx.commit().await?;

        info!(added = quantity.get(), stock_after = product.stock(), "restocked");
        Ok(product)
    }

    pub async fn products(&self) -> Result<Vec<Product>, StorefrontError> {
        Ok(self.store.list_products().await?)
    }

    pub async fn product(&self, product_id: ProductId) -> Result<Product, StorefrontError> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("product").into())
    }

    /// The user's cart, or `None` when nothing has been added yet. Never
    /// creates a cart.
    pub async fn cart(&self, user_id: UserId) -> Result<Option<Cart>, StorefrontError> {
        Ok(self.store.load_cart(user_id).await?)
    }

    /// The user's orders, newest first.
    pub async fn orders_for(&self, user_id: UserId) -> Result<Vec<Order>, StorefrontError> {
        Ok(self.store.list_orders(Some(user_id)).await?)
    }

    /// Every order, newest first.
    pub async fn all_orders(&self) -> Result<Vec<Order>, StorefrontError> {
        Ok(self.store.list_orders(None).await?)
    }
}
