use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sweetshop_cart::{Cart, CartLine};
use sweetshop_core::{CartId, CartItemId, Money, OrderId, ProductId, UserId};
use sweetshop_infra::{RemovedLine, StorefrontError};
use sweetshop_orders::{Order, OrderLine, OrderStatus};
use sweetshop_products::Product;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub cart_item_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub quantity: i64,
}

/// Parse a path or body id, answering 400 `invalid_id` on failure.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = sweetshop_core::DomainError>,
{
    raw.trim().parse::<T>().map_err(|e| {
        errors::json_error(axum::http::StatusCode::BAD_REQUEST, "invalid_id", e.to_string())
    })
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub category: String,
    pub stock: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&Product> for ProductResponse {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id(),
            name: p.name().to_string(),
            price: p.price(),
            category: p.category().to_string(),
            stock: p.stock(),
            image_url: p.image_url().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartLineResponse {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub price: Money,
}

impl From<&CartLine> for CartLineResponse {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.id,
            cart_id: line.cart_id,
            product_id: line.product_id,
            quantity: line.quantity.get(),
            price: line.price,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart_id: Option<CartId>,
    pub items: Vec<CartLineResponse>,
    pub total: Money,
}

impl CartResponse {
    /// A user with no cart yet sees an empty one.
    pub fn empty() -> Self {
        Self {
            cart_id: None,
            items: Vec::new(),
            total: Money::zero(),
        }
    }

    pub fn from_cart(cart: &Cart) -> Result<Self, StorefrontError> {
        Ok(Self {
            cart_id: Some(cart.id),
            items: cart.lines.iter().map(CartLineResponse::from).collect(),
            total: cart.total()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub success: bool,
    pub returned_stock: i64,
}

impl From<&RemovedLine> for RemoveResponse {
    fn from(removed: &RemovedLine) -> Self {
        Self {
            success: true,
            returned_stock: removed.returned_stock,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub price: Money,
}

impl From<&OrderLine> for OrderLineResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity.get(),
            price: line.price,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLineResponse>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            total: order.total,
            created_at: order.created_at,
            items: order.lines.iter().map(OrderLineResponse::from).collect(),
        }
    }
}
