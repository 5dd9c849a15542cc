use serde::Serialize;

use sweetshop_core::{DomainError, DomainResult, ProductId};
use sweetshop_products::Product;

/// Outcome of a stock reservation against one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reservation {
    pub product_id: ProductId,
    /// Positive consumes stock, negative returns it.
    pub delta: i64,
    pub stock_before: i64,
    pub stock_after: i64,
}

impl Reservation {
    pub fn is_noop(&self) -> bool {
        self.delta == 0
    }
}

/// Decide the stock level after reserving `delta` units of `product`.
///
/// - `delta > 0` consumes stock and fails with `OutOfStock` when it exceeds
///   what is available.
/// - `delta < 0` returns stock and only fails on arithmetic overflow.
/// - `delta == 0` is a no-op.
///
/// The caller must hold a lock on the product row for the decision to stand.
pub fn reserve(product: &Product, delta: i64) -> DomainResult<Reservation> {
    let available = product.stock();

    if delta > available {
        return Err(DomainError::out_of_stock(delta, available));
    }

    let stock_after = available
        .checked_sub(delta)
        .ok_or_else(|| DomainError::invariant("stock overflow"))?;

    // delta <= available already rules this out for consumption.
    if stock_after < 0 {
        return Err(DomainError::invariant("stock cannot go negative"));
    }

    Ok(Reservation {
        product_id: product.id(),
        delta,
        stock_before: available,
        stock_after,
    })
}
