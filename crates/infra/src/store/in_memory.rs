use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use sweetshop_cart::{Cart, CartLine, OwnedLine};
use sweetshop_core::{CartId, CartItemId, ProductId, UserId};
use sweetshop_orders::Order;
use sweetshop_products::Product;

use super::r#trait::{Storage, StorageTx, StoreError};

#[derive(Debug, Default, Clone)]
struct State {
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, CartId>,
    cart_owners: HashMap<CartId, UserId>,
    lines: HashMap<CartItemId, CartLine>,
    /// Insertion order; newest last.
    orders: Vec<Order>,
}

impl State {
    fn owned_line(&self, id: CartItemId) -> Result<Option<OwnedLine>, StoreError> {
        let Some(line) = self.lines.get(&id) else {
            return Ok(None);
        };
        let owner = self.cart_owners.get(&line.cart_id).copied().ok_or_else(|| {
            StoreError::Integrity(format!("cart line {id} references a missing cart"))
        })?;
        Ok(Some(OwnedLine {
            line: line.clone(),
            owner,
        }))
    }
}

/// In-memory storefront store.
///
/// Intended for tests/dev. A single store-wide async mutex is held by each
/// transaction for its whole lifetime, so transactions run one at a time.
/// Changes are made on a private copy of the state and only written back on
/// commit; dropping the transaction discards them.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    lock_timeout: Duration,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl InMemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            lock_timeout,
        }
    }

    async fn acquire(&self) -> Result<OwnedMutexGuard<State>, StoreError> {
        tokio::time::timeout(self.lock_timeout, self.state.clone().lock_owned())
            .await
            .map_err(|_| {
                StoreError::Contention(format!(
                    "store lock not acquired within {}ms",
                    self.lock_timeout.as_millis()
                ))
            })
    }
}

#[async_trait]
impl Storage for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StorageTx>, StoreError> {
        let guard = self.acquire().await?;
        let working = guard.clone();
        Ok(Box::new(InMemoryTx { guard, working }))
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let state = self.acquire().await?;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(&b.id())));
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let state = self.acquire().await?;
        Ok(state.products.get(&id).cloned())
    }

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, StoreError> {
        let state = self.acquire().await?;
        Ok(state.products.values().find(|p| p.name() == name).cloned())
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut state = self.acquire().await?;
        if state.products.contains_key(&product.id()) {
            return Err(StoreError::Integrity(format!(
                "product {} already exists",
                product.id()
            )));
        }
        state.products.insert(product.id(), product.clone());
        Ok(())
    }

    async fn load_cart(&self, user_id: UserId) -> Result<Option<Cart>, StoreError> {
        let state = self.acquire().await?;
        let Some(cart_id) = state.carts.get(&user_id).copied() else {
            return Ok(None);
        };
        let mut cart = Cart::new(cart_id, user_id);
        cart.lines = state
            .lines
            .values()
            .filter(|l| l.cart_id == cart_id)
            .cloned()
            .collect();
        cart.lines.sort_by_key(|l| l.id);
        Ok(Some(cart))
    }

    async fn list_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>, StoreError> {
        let state = self.acquire().await?;
        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .rev()
            .filter(|o| user_id.is_none_or(|u| o.user_id == u))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<State>,
    working: State,
}

#[async_trait]
impl StorageTx for InMemoryTx {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn write_stock(&mut self, id: ProductId, stock: i64) -> Result<(), StoreError> {
        let product = self
            .working
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::Integrity(format!("product {id} vanished mid-transaction")))?;
        *product = product
            .with_stock(stock)
            .map_err(|e| StoreError::Integrity(e.to_string()))?;
        Ok(())
    }

    async fn find_or_create_cart(&mut self, user_id: UserId) -> Result<CartId, StoreError> {
        if let Some(id) = self.working.carts.get(&user_id) {
            return Ok(*id);
        }
        let id = CartId::new();
        self.working.carts.insert(user_id, id);
        self.working.cart_owners.insert(id, user_id);
        Ok(id)
    }

    async fn find_line_for_product(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, StoreError> {
        Ok(self
            .working
            .lines
            .values()
            .find(|l| l.cart_id == cart_id && l.product_id == product_id)
            .cloned())
    }

    async fn peek_cart_line(&mut self, id: CartItemId) -> Result<Option<OwnedLine>, StoreError> {
        self.working.owned_line(id)
    }

    async fn lock_cart_line(&mut self, id: CartItemId) -> Result<Option<OwnedLine>, StoreError> {
        self.working.owned_line(id)
    }

    async fn insert_line(&mut self, line: &CartLine) -> Result<(), StoreError> {
        let duplicate = self
            .working
            .lines
            .values()
            .any(|l| l.cart_id == line.cart_id && l.product_id == line.product_id);
        if duplicate {
            return Err(StoreError::Integrity(format!(
                "cart {} already holds product {}",
                line.cart_id, line.product_id
            )));
        }
        self.working.lines.insert(line.id, line.clone());
        Ok(())
    }

    async fn update_line(&mut self, line: &CartLine) -> Result<(), StoreError> {
        match self.working.lines.get_mut(&line.id) {
            Some(existing) => {
                *existing = line.clone();
                Ok(())
            }
            None => Err(StoreError::Integrity(format!("cart line {} vanished", line.id))),
        }
    }

    async fn delete_line(&mut self, id: CartItemId) -> Result<(), StoreError> {
        self.working.lines.remove(&id);
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        self.working.orders.push(order.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweetshop_core::Money;
    use sweetshop_products::NewProduct;

    fn product(stock: i64) -> Product {
        NewProduct {
            name: "Licorice".to_string(),
            price: Money::from_minor(75),
            category: "Chewy".to_string(),
            stock,
            image_url: None,
        }
        .into_product()
        .unwrap()
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryStore::default();
        let p = product(5);
        store.insert_product(&p).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.write_stock(p.id(), 1).await.unwrap();
        }

        assert_eq!(store.get_product(p.id()).await.unwrap().unwrap().stock(), 5);
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let store = InMemoryStore::default();
        let p = product(5);
        store.insert_product(&p).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.write_stock(p.id(), 1).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.get_product(p.id()).await.unwrap().unwrap().stock(), 1);
    }

    #[tokio::test]
    async fn second_transaction_times_out_while_first_is_open() {
        let store = InMemoryStore::new(Duration::from_millis(20));
        let _held = store.begin().await.unwrap();

        match store.begin().await {
            Err(StoreError::Contention(_)) => {}
            Err(other) => panic!("expected contention, got {other:?}"),
            Ok(_) => panic!("expected contention, got a transaction"),
        }
    }

    #[tokio::test]
    async fn find_or_create_cart_is_idempotent() {
        let store = InMemoryStore::default();
        let user = UserId::new();

        let mut tx = store.begin().await.unwrap();
        let first = tx.find_or_create_cart(user).await.unwrap();
        let second = tx.find_or_create_cart(user).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.load_cart(user).await.unwrap().unwrap().id, first);
    }
}
