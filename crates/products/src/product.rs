use serde::{Deserialize, Serialize};

use sweetshop_core::{DomainError, DomainResult, Money, ProductId, Quantity};

/// A catalog entry: something the shop sells, with its current stock level.
///
/// Stock is never negative. Only the inventory ledger decides new stock
/// levels; this type merely carries them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    id: ProductId,
    name: String,
    price: Money,
    category: String,
    stock: i64,
    image_url: Option<String>,
}

/// Input for adding a product to the catalog (seed files, tests).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    /// Unit price in minor currency units.
    pub price: Money,
    pub category: String,
    pub stock: i64,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewProduct {
    /// Validate and assign a fresh id.
    pub fn into_product(self) -> DomainResult<Product> {
        Product::restore(
            ProductId::new(),
            self.name,
            self.price,
            self.category,
            self.stock,
            self.image_url,
        )
    }
}

impl Product {
    /// Rebuild a product from stored fields, enforcing catalog invariants.
    pub fn restore(
        id: ProductId,
        name: String,
        price: Money,
        category: String,
        stock: i64,
        image_url: Option<String>,
    ) -> DomainResult<Self> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        if price == Money::zero() {
            return Err(DomainError::validation("price must be positive"));
        }
        if stock < 0 {
            return Err(DomainError::invariant("stock cannot be negative"));
        }

        Ok(Self {
            id,
            name,
            price,
            category,
            stock,
            image_url: image_url.filter(|u| !u.trim().is_empty()),
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    /// Price of `quantity` units at the current unit price.
    pub fn line_price(&self, quantity: Quantity) -> DomainResult<Money> {
        self.price.times(quantity)
    }

    /// Same product at a different stock level.
    pub fn with_stock(&self, stock: i64) -> DomainResult<Self> {
        if stock < 0 {
            return Err(DomainError::invariant("stock cannot be negative"));
        }
        Ok(Self {
            stock,
            ..self.clone()
        })
    }
}
