use serde::Serialize;

use sweetshop_core::{CartId, CartItemId, DomainError, DomainResult, Money, ProductId, Quantity, UserId};
use sweetshop_products::Product;

/// A single product entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// `product.price × quantity` as of the last mutation of this line.
    pub price: Money,
}

/// Result of changing a line's quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requantified {
    pub line: CartLine,
    /// `new − old`; the stock reservation the change requires.
    pub diff: i64,
}

impl CartLine {
    /// Start a new line for `product` in `cart_id`.
    pub fn new(cart_id: CartId, product: &Product, quantity: Quantity) -> DomainResult<Self> {
        Ok(Self {
            id: CartItemId::new(),
            cart_id,
            product_id: product.id(),
            quantity,
            price: product.line_price(quantity)?,
        })
    }

    /// Merge a repeated add into this line.
    pub fn merged(&self, product: &Product, added: Quantity) -> DomainResult<Self> {
        self.ensure_product(product)?;
        let quantity = self.quantity.checked_add(added)?;
        Ok(Self {
            quantity,
            price: product.line_price(quantity)?,
            ..self.clone()
        })
    }

    /// Set a new absolute quantity.
    pub fn requantified(&self, product: &Product, quantity: Quantity) -> DomainResult<Requantified> {
        self.ensure_product(product)?;
        let diff = quantity
            .get()
            .checked_sub(self.quantity.get())
            .ok_or_else(|| DomainError::invariant("quantity diff overflow"))?;
        Ok(Requantified {
            line: Self {
                quantity,
                price: product.line_price(quantity)?,
                ..self.clone()
            },
            diff,
        })
    }

    fn ensure_product(&self, product: &Product) -> DomainResult<()> {
        if self.product_id != product.id() {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }
}

/// A cart line together with the user whose cart holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedLine {
    pub line: CartLine,
    pub owner: UserId,
}

impl OwnedLine {
    pub fn ensure_owned_by(&self, caller: UserId) -> DomainResult<()> {
        if self.owner != caller {
            return Err(DomainError::Forbidden);
        }
        Ok(())
    }
}

/// A user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(id: CartId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            lines: Vec::new(),
        }
    }

    pub fn total(&self) -> DomainResult<Money> {
        self.lines
            .iter()
            .try_fold(Money::zero(), |acc, l| acc.checked_add(l.price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweetshop_products::NewProduct;

    fn product(price: u64, stock: i64) -> Product {
        NewProduct {
            name: "Toffee".to_string(),
            price: Money::from_minor(price),
            category: "Chewy".to_string(),
            stock,
            image_url: None,
        }
        .into_product()
        .unwrap()
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn new_line_prices_at_current_unit_price() {
        let p = product(10, 5);
        let line = CartLine::new(CartId::new(), &p, qty(3)).unwrap();
        assert_eq!(line.quantity, qty(3));
        assert_eq!(line.price, Money::from_minor(30));
    }

    #[test]
    fn merge_adds_quantities_and_reprices() {
        let p = product(10, 5);
        let line = CartLine::new(CartId::new(), &p, qty(1)).unwrap();
        let merged = line.merged(&p, qty(2)).unwrap();
        assert_eq!(merged.id, line.id);
        assert_eq!(merged.quantity, qty(3));
        assert_eq!(merged.price, Money::from_minor(30));
    }

    #[test]
    fn merge_rejects_a_different_product() {
        let line = CartLine::new(CartId::new(), &product(10, 5), qty(1)).unwrap();
        let err = line.merged(&product(10, 5), qty(1)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn requantify_reports_signed_diff() {
        let p = product(10, 5);
        let line = CartLine::new(CartId::new(), &p, qty(3)).unwrap();

        let up = line.requantified(&p, qty(5)).unwrap();
        assert_eq!(up.diff, 2);
        assert_eq!(up.line.price, Money::from_minor(50));

        let down = line.requantified(&p, qty(1)).unwrap();
        assert_eq!(down.diff, -2);
        assert_eq!(down.line.price, Money::from_minor(10));
    }

    #[test]
    fn foreign_owner_is_forbidden() {
        let p = product(10, 5);
        let owned = OwnedLine {
            line: CartLine::new(CartId::new(), &p, qty(1)).unwrap(),
            owner: UserId::new(),
        };
        assert_eq!(owned.ensure_owned_by(UserId::new()), Err(DomainError::Forbidden));
        assert_eq!(owned.ensure_owned_by(owned.owner), Ok(()));
    }

    #[test]
    fn total_sums_line_prices() {
        let a = product(10, 5);
        let b = product(25, 5);
        let mut cart = Cart::new(CartId::new(), UserId::new());
        cart.lines.push(CartLine::new(cart.id, &a, qty(2)).unwrap());
        cart.lines.push(CartLine::new(cart.id, &b, qty(1)).unwrap());
        assert_eq!(cart.total().unwrap(), Money::from_minor(45));
    }

    #[test]
    fn empty_cart_totals_zero() {
        let cart = Cart::new(CartId::new(), UserId::new());
        assert_eq!(cart.total().unwrap(), Money::zero());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: the line price always equals unit price × quantity,
            /// whatever sequence of merges and requantifications produced it.
            #[test]
            fn price_tracks_quantity(
                price in 1u64..10_000,
                start in 1i64..50,
                steps in proptest::collection::vec((any::<bool>(), 1i64..50), 0..20)
            ) {
                let p = product(price, 0);
                let mut line = CartLine::new(CartId::new(), &p, qty(start)).unwrap();
                for (merge, n) in steps {
                    line = if merge {
                        line.merged(&p, qty(n)).unwrap()
                    } else {
                        line.requantified(&p, qty(n)).unwrap().line
                    };
                    prop_assert_eq!(line.price, Money::from_minor(price * line.quantity.get() as u64));
                }
            }
        }
    }
}
