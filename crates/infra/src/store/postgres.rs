//! Postgres-backed storefront store.
//!
//! Every [`StorageTx`] is one database transaction. Stock decisions are made
//! on product rows taken with `SELECT … FOR UPDATE`, and every transaction
//! sets a local `lock_timeout` so no request waits on a lock indefinitely.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database | `40001` | `Contention` | Serialization failure |
//! | Database | `40P01` | `Contention` | Deadlock detected and broken |
//! | Database | `55P03` | `Contention` | `lock_timeout` elapsed |
//! | Database | `23505` on `cart_items_cart_id_product_id_key` | `Contention` | Concurrent insert of the same cart line |
//! | Database | `23505` (other) | `Integrity` | Duplicate product name, etc. |
//! | Database | `23503` / `23514` | `Integrity` | Foreign key / check constraint |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | Other | N/A | `Backend` | Network errors, pool closed, etc. |

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use sweetshop_cart::{Cart, CartLine, OwnedLine};
use sweetshop_core::{
    CartId, CartItemId, Money, OrderId, OrderLineId, ProductId, Quantity, UserId,
};
use sweetshop_orders::{Order, OrderLine, OrderStatus};
use sweetshop_products::Product;

use super::r#trait::{Storage, StorageTx, StoreError};

const PRODUCT_COLUMNS: &str = "id, name, price, category, stock, image_url";

/// Postgres' generated name for `UNIQUE (cart_id, product_id)` on `cart_items`.
const CART_LINE_UNIQUE: &str = "cart_items_cart_id_product_id_key";

/// Postgres storefront store.
///
/// Uses the SQLx connection pool, which is thread-safe (Arc + Send + Sync).
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
    lock_timeout: Duration,
}

impl PostgresStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self {
            pool: Arc::new(pool),
            lock_timeout,
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        lock_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool, lock_timeout))
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migrations failed: {e}")))
    }

    async fn load_lines(&self, order_ids: Vec<Uuid>) -> Result<HashMap<Uuid, Vec<OrderLine>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, product_name, quantity, price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_order_lines", e))?;

        let mut by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let line = OrderLineRow::from_row(&row)
                .map_err(|e| StoreError::Integrity(format!("failed to read order line row: {e}")))?;
            by_order
                .entry(line.order_id)
                .or_default()
                .push(line.try_into()?);
        }
        Ok(by_order)
    }
}

#[async_trait]
impl Storage for PostgresStore {
    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<Box<dyn StorageTx>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_lock_timeout", e))?;

        Ok(Box::new(PostgresTx { tx }))
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name ASC, id ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE name = $1"))
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_product_by_name", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, product), fields(product_id = %product.id()), err)]
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, category, stock, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.id().as_uuid())
        .bind(product.name())
        .bind(money_to_db(product.price())?)
        .bind(product.category())
        .bind(product.stock())
        .bind(product.image_url())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn load_cart(&self, user_id: UserId) -> Result<Option<Cart>, StoreError> {
        let cart_row = sqlx::query("SELECT id FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_cart", e))?;

        let Some(cart_row) = cart_row else {
            return Ok(None);
        };
        let cart_id: Uuid = cart_row
            .try_get("id")
            .map_err(|e| StoreError::Integrity(format!("failed to read cart row: {e}")))?;

        let rows = sqlx::query(
            r#"
            SELECT id, cart_id, product_id, quantity, price
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(cart_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_cart_lines", e))?;

        let mut cart = Cart::new(CartId::from_uuid(cart_id), user_id);
        for row in rows {
            cart.lines.push(cart_line_from_row(&row)?);
        }
        Ok(Some(cart))
    }

    #[instrument(skip(self), fields(user_id = ?user_id), err)]
    async fn list_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>, StoreError> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query(
                    r#"
                    SELECT id, user_id, status, total, created_at
                    FROM orders
                    WHERE user_id = $1
                    ORDER BY created_at DESC, id DESC
                    "#,
                )
                .bind(*user_id.as_uuid())
                .fetch_all(&*self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, user_id, status, total, created_at
                    FROM orders
                    ORDER BY created_at DESC, id DESC
                    "#,
                )
                .fetch_all(&*self.pool)
                .await
            }
        }
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        let headers = rows
            .iter()
            .map(|row| {
                OrderRow::from_row(row)
                    .map_err(|e| StoreError::Integrity(format!("failed to read order row: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let mut lines = self.load_lines(headers.iter().map(|h| h.id).collect()).await?;

        headers
            .into_iter()
            .map(|h| {
                let order_lines = lines.remove(&h.id).unwrap_or_default();
                h.into_order(order_lines)
            })
            .collect()
    }
}

/// A single Postgres transaction.
struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StorageTx for PostgresTx {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn write_stock(&mut self, id: ProductId, stock: i64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE products SET stock = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(stock)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("write_stock", e))?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Integrity(format!(
                "stock update touched {} rows for product {id}",
                result.rows_affected()
            )));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn find_or_create_cart(&mut self, user_id: UserId) -> Result<CartId, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO carts (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id
            "#,
        )
        .bind(*CartId::new().as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_or_create_cart", e))?;

        let id: Uuid = row
            .try_get("id")
            .map_err(|e| StoreError::Integrity(format!("failed to read cart id: {e}")))?;
        Ok(CartId::from_uuid(id))
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id), err)]
    async fn find_line_for_product(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, cart_id, product_id, quantity, price
            FROM cart_items
            WHERE cart_id = $1 AND product_id = $2
            FOR UPDATE
            "#,
        )
        .bind(cart_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_line_for_product", e))?;

        row.as_ref().map(cart_line_from_row).transpose()
    }

    #[instrument(skip(self), fields(cart_item_id = %id), err)]
    async fn peek_cart_line(&mut self, id: CartItemId) -> Result<Option<OwnedLine>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity, ci.price, c.user_id
            FROM cart_items ci
            JOIN carts c ON c.id = ci.cart_id
            WHERE ci.id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("peek_cart_line", e))?;

        row.as_ref().map(owned_line_from_row).transpose()
    }

    #[instrument(skip(self), fields(cart_item_id = %id), err)]
    async fn lock_cart_line(&mut self, id: CartItemId) -> Result<Option<OwnedLine>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity, ci.price, c.user_id
            FROM cart_items ci
            JOIN carts c ON c.id = ci.cart_id
            WHERE ci.id = $1
            FOR UPDATE OF ci
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_cart_line", e))?;

        row.as_ref().map(owned_line_from_row).transpose()
    }

    #[instrument(skip(self, line), fields(cart_item_id = %line.id), err)]
    async fn insert_line(&mut self, line: &CartLine) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.cart_id.as_uuid())
        .bind(line.product_id.as_uuid())
        .bind(line.quantity.get())
        .bind(money_to_db(line.price)?)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_line", e))?;
        Ok(())
    }

    #[instrument(skip(self, line), fields(cart_item_id = %line.id), err)]
    async fn update_line(&mut self, line: &CartLine) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE cart_items SET quantity = $2, price = $3 WHERE id = $1")
            .bind(line.id.as_uuid())
            .bind(line.quantity.get())
            .bind(money_to_db(line.price)?)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_line", e))?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Integrity(format!("cart line {} vanished", line.id)));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(cart_item_id = %id), err)]
    async fn delete_line(&mut self, id: CartItemId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_line", e))?;
        Ok(())
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, user_id = %order.user_id), err)]
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, total, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.status.as_str())
        .bind(money_to_db(order.total)?)
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for line in &order.lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, product_name, quantity, price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(line.id.as_uuid())
            .bind(line.order_id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(&line.product_name)
            .bind(line.quantity.get())
            .bind(money_to_db(line.price)?)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_line", e))?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                // serialization_failure, deadlock_detected, lock_not_available
                Some("40001") | Some("40P01") | Some("55P03") => StoreError::Contention(msg),
                // unique_violation on a cart line: a concurrent add inserted it first
                Some("23505") if db_err.constraint() == Some(CART_LINE_UNIQUE) => {
                    StoreError::Contention(msg)
                }
                Some("23505") => StoreError::Integrity(msg),
                Some("23503") | Some("23514") => StoreError::Integrity(msg),
                _ => StoreError::Backend(msg),
            }
        }
        other => StoreError::Backend(format!("{} failed: {}", operation, other)),
    }
}

fn money_to_db(amount: Money) -> Result<i64, StoreError> {
    i64::try_from(amount.minor_units())
        .map_err(|_| StoreError::Integrity(format!("amount {} exceeds column range", amount.minor_units())))
}

fn money_from_db(column: &str, value: i64) -> Result<Money, StoreError> {
    u64::try_from(value)
        .map(Money::from_minor)
        .map_err(|_| StoreError::Integrity(format!("negative {column}: {value}")))
}

fn quantity_from_db(value: i64) -> Result<Quantity, StoreError> {
    Quantity::new(value).map_err(|e| StoreError::Integrity(e.to_string()))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let read = |e: sqlx::Error| StoreError::Integrity(format!("failed to read product row: {e}"));

    let id: Uuid = row.try_get("id").map_err(read)?;
    let price: i64 = row.try_get("price").map_err(read)?;

    Product::restore(
        ProductId::from_uuid(id),
        row.try_get("name").map_err(read)?,
        money_from_db("price", price)?,
        row.try_get("category").map_err(read)?,
        row.try_get("stock").map_err(read)?,
        row.try_get("image_url").map_err(read)?,
    )
    .map_err(|e| StoreError::Integrity(e.to_string()))
}

fn cart_line_from_row(row: &PgRow) -> Result<CartLine, StoreError> {
    let read = |e: sqlx::Error| StoreError::Integrity(format!("failed to read cart line row: {e}"));

    let id: Uuid = row.try_get("id").map_err(read)?;
    let cart_id: Uuid = row.try_get("cart_id").map_err(read)?;
    let product_id: Uuid = row.try_get("product_id").map_err(read)?;
    let quantity: i64 = row.try_get("quantity").map_err(read)?;
    let price: i64 = row.try_get("price").map_err(read)?;

    Ok(CartLine {
        id: CartItemId::from_uuid(id),
        cart_id: CartId::from_uuid(cart_id),
        product_id: ProductId::from_uuid(product_id),
        quantity: quantity_from_db(quantity)?,
        price: money_from_db("price", price)?,
    })
}

fn owned_line_from_row(row: &PgRow) -> Result<OwnedLine, StoreError> {
    let owner: Uuid = row
        .try_get("user_id")
        .map_err(|e| StoreError::Integrity(format!("failed to read cart owner: {e}")))?;
    Ok(OwnedLine {
        line: cart_line_from_row(row)?,
        owner: UserId::from_uuid(owner),
    })
}

// SQLx row types

#[derive(Debug)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    status: String,
    total: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            status: row.try_get("status")?,
            total: row.try_get("total")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Result<Order, StoreError> {
        let order = Order {
            id: OrderId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            status: self
                .status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::Integrity(e.to_string()))?,
            total: money_from_db("total", self.total)?,
            created_at: self.created_at,
            lines,
        };

        let lines_total = order
            .lines_total()
            .map_err(|e| StoreError::Integrity(e.to_string()))?;
        if lines_total != order.total {
            return Err(StoreError::Integrity(format!(
                "order {} total {} does not match its lines ({})",
                order.id, order.total, lines_total
            )));
        }
        Ok(order)
    }
}

#[derive(Debug)]
struct OrderLineRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    quantity: i64,
    price: i64,
}

impl<'r> FromRow<'r, PgRow> for OrderLineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderLineRow {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            quantity: row.try_get("quantity")?,
            price: row.try_get("price")?,
        })
    }
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = StoreError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        Ok(OrderLine {
            id: OrderLineId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            product_id: ProductId::from_uuid(row.product_id),
            product_name: row.product_name,
            quantity: quantity_from_db(row.quantity)?,
            price: money_from_db("price", row.price)?,
        })
    }
}
