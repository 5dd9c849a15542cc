use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sweetshop_core::{
    DomainError, DomainResult, Money, OrderId, OrderLineId, ProductId, Quantity, UserId,
};
use sweetshop_products::Product;

/// Order status lifecycle.
///
/// Orders are created `PENDING`. The other states are stored values only;
/// nothing in the storefront transitions to them yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::invariant(format!("unknown order status '{other}'"))),
        }
    }
}

/// Order line: product, quantity and the price paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: Quantity,
    /// Frozen at placement: later price changes never touch it.
    pub price: Money,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Buy `quantity` units of `product` right now.
    ///
    /// The product must be the locked, current row: stock is checked against
    /// it and the line price is snapshotted from its unit price.
    pub fn place(
        user_id: UserId,
        product: &Product,
        quantity: Quantity,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity.get() > product.stock() {
            return Err(DomainError::out_of_stock(quantity.get(), product.stock()));
        }

        let id = OrderId::new();
        let price = product.line_price(quantity)?;

        Ok(Self {
            id,
            user_id,
            status: OrderStatus::Pending,
            total: price,
            created_at,
            lines: vec![OrderLine {
                id: OrderLineId::new(),
                order_id: id,
                product_id: product.id(),
                product_name: product.name().to_string(),
                quantity,
                price,
            }],
        })
    }

    /// Sum of line prices; must equal `total` for a well-formed order.
    pub fn lines_total(&self) -> DomainResult<Money> {
        self.lines
            .iter()
            .try_fold(Money::zero(), |acc, l| acc.checked_add(l.price))
    }
}
