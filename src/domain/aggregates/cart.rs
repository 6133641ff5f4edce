//! Cart Aggregate
//!
//! Pure line-item bookkeeping. Persistence lives in [`crate::ledger`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::{Money, MoneyError, ProductId, Quantity};

/// Maximum quantity allowed per cart line.
pub const MAX_QUANTITY_PER_LINE: u32 = 9999;

/// Flat-fee shipping, waived strictly above a subtotal threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub free_above: Decimal,
    pub flat_fee: Decimal,
}

impl ShippingPolicy {
    pub fn standard() -> Self { Self { free_above: Decimal::new(300, 0), flat_fee: Decimal::new(30, 0) } }

    pub fn fee_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal > self.free_above { Decimal::ZERO } else { self.flat_fee }
    }
}

impl Default for ShippingPolicy { fn default() -> Self { Self::standard() } }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub image: String,
    pub quantity: Quantity,
}

impl CartLine {
    pub fn for_product(product: &Product, quantity: Quantity) -> Self {
        Self {
            product_id: product.id().clone(), name: product.name().to_string(),
            unit_price: product.price(), image: product.image().to_string(), quantity,
        }
    }

    pub fn line_total(&self, currency: &str) -> Result<Money, MoneyError> {
        Money::new(self.unit_price, currency).checked_mul(self.quantity)
    }
}

struct Totals { subtotal: Money, shipping: Money, total: Money }

fn totals_of(lines: &[CartLine], currency: &str, policy: &ShippingPolicy) -> Result<Totals, MoneyError> {
    let subtotal = lines.iter().try_fold(Money::zero(currency), |acc, l| acc.checked_add(&l.line_total(currency)?))?;
    let shipping = Money::new(policy.fee_for(subtotal.amount()), currency);
    let total = subtotal.checked_add(&shipping)?;
    Ok(Totals { subtotal, shipping, total })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CartState { Empty, Populated }

#[derive(Clone, Debug)]
pub struct Cart {
    lines: Vec<CartLine>,
    currency: String,
    shipping: ShippingPolicy,
}

impl Cart {
    pub fn new(currency: &str) -> Self { Self::with_policy(currency, ShippingPolicy::standard()) }

    pub fn with_policy(currency: &str, shipping: ShippingPolicy) -> Self {
        Self { lines: vec![], currency: currency.to_string(), shipping }
    }

    /// Rebuilds a cart from persisted lines, rejecting anything that breaks the line invariants.
    pub fn restore(currency: &str, shipping: ShippingPolicy, lines: Vec<CartLine>) -> Result<Self, CartError> {
        let mut seen = HashSet::new();
        for line in &lines {
            if line.unit_price.is_sign_negative() { return Err(CartError::NegativePrice(line.product_id.clone())); }
            if line.quantity.value() > MAX_QUANTITY_PER_LINE {
                return Err(CartError::QuantityLimit { product_id: line.product_id.clone(), limit: MAX_QUANTITY_PER_LINE });
            }
            if !seen.insert(&line.product_id) { return Err(CartError::DuplicateLine(line.product_id.clone())); }
        }
        totals_of(&lines, currency, &shipping).map_err(|_| CartError::AmountOverflow(None))?;
        Ok(Self { lines, currency: currency.to_string(), shipping })
    }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> { self.lines.iter().find(|l| &l.product_id == product_id) }

    pub fn state(&self) -> CartState {
        if self.lines.is_empty() { CartState::Empty } else { CartState::Populated }
    }

    /// Merges into the existing line for the product, or appends a new one.
    ///
    /// The cart is left untouched when the line would exceed [`MAX_QUANTITY_PER_LINE`]
    /// or the totals would no longer be representable.
    pub fn add_or_increment(&mut self, product: &Product, qty: Quantity) -> Result<(), CartError> {
        let limit = || CartError::QuantityLimit { product_id: product.id().clone(), limit: MAX_QUANTITY_PER_LINE };
        let mut lines = self.lines.clone();
        match lines.iter_mut().find(|l| &l.product_id == product.id()) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(qty).filter(|q| q.value() <= MAX_QUANTITY_PER_LINE).ok_or_else(limit)?;
            }
            None if qty.value() > MAX_QUANTITY_PER_LINE => return Err(limit()),
            None => lines.push(CartLine::for_product(product, qty)),
        }
        totals_of(&lines, &self.currency, &self.shipping).map_err(|_| CartError::AmountOverflow(Some(product.id().clone())))?;
        self.lines = lines;
        Ok(())
    }

    /// Returns `false` when the product is not in the cart.
    pub fn decrement(&mut self, product_id: &ProductId) -> bool {
        let Some(pos) = self.lines.iter().position(|l| &l.product_id == product_id) else { return false };
        match self.lines[pos].quantity.decrement() {
            Some(q) => self.lines[pos].quantity = q,
            None => { self.lines.remove(pos); }
        }
        true
    }

    /// Returns `false` when the product is not in the cart.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.product_id != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) { self.lines.clear(); }

    /// Every path that grows the cart checks the totals first, so the saturated
    /// fallback is never observed.
    fn totals(&self) -> Totals {
        totals_of(&self.lines, &self.currency, &self.shipping).unwrap_or_else(|_| {
            let max = Money::new(Decimal::MAX, &self.currency);
            Totals { subtotal: max.clone(), shipping: Money::zero(&self.currency), total: max }
        })
    }

    /// A line's total in the cart currency.
    pub fn line_total(&self, line: &CartLine) -> Money {
        line.line_total(&self.currency).unwrap_or_else(|_| Money::new(Decimal::MAX, &self.currency))
    }

    pub fn subtotal(&self) -> Money { self.totals().subtotal }
    pub fn shipping_fee(&self) -> Money { self.totals().shipping }
    pub fn total(&self) -> Money { self.totals().total }

    pub fn total_quantity(&self) -> u64 { self.lines.iter().map(|l| u64::from(l.quantity.value())).sum() }

    /// How much more must be spent before shipping becomes free; zero once it is.
    pub fn amount_to_free_shipping(&self) -> Money {
        let subtotal = self.subtotal().amount();
        let remaining = if self.shipping.fee_for(subtotal).is_zero() { Decimal::ZERO } else { self.shipping.free_above - subtotal };
        Money::new(remaining, &self.currency)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("duplicate cart line for product {0}")]
    DuplicateLine(ProductId),

    #[error("negative unit price for product {0}")]
    NegativePrice(ProductId),

    #[error("at most {limit} units of product {product_id} per line")]
    QuantityLimit { product_id: ProductId, limit: u32 },

    #[error("cart total out of range")]
    AmountOverflow(Option<ProductId>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{product, product_at};
    use proptest::prelude::*;

    fn qty(n: u32) -> Quantity { Quantity::new(n).unwrap() }

    #[test]
    fn test_add_merges_same_product() {
        let oud = product("oud", 450);
        let mut cart = Cart::new("ILS");
        cart.add_or_increment(&oud, qty(2)).unwrap();
        cart.add_or_increment(&oud, qty(3)).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity.value(), 5);
    }

    #[test]
    fn test_total_quantity_sums_distinct_products() {
        let mut cart = Cart::new("ILS");
        for (i, n) in [1u32, 4, 2, 7].iter().enumerate() {
            cart.add_or_increment(&product(&format!("p{i}"), 10), qty(*n)).unwrap();
        }
        assert_eq!(cart.total_quantity(), 14);
        assert_eq!(cart.lines().len(), 4);
    }

    #[test]
    fn test_decrement_last_unit_removes_line() {
        let lotus = product("lotus", 199);
        let mut cart = Cart::new("ILS");
        cart.add_or_increment(&lotus, qty(2)).unwrap();
        assert!(cart.decrement(lotus.id()));
        assert_eq!(cart.line(lotus.id()).unwrap().quantity.value(), 1);
        assert!(cart.decrement(lotus.id()));
        assert!(cart.line(lotus.id()).is_none());
        assert_eq!(cart.state(), CartState::Empty);
    }

    #[test]
    fn test_unknown_product_is_noop() {
        let mut cart = Cart::new("ILS");
        cart.add_or_increment(&product("a", 10), Quantity::ONE).unwrap();
        assert!(!cart.decrement(&ProductId::new("missing")));
        assert!(!cart.remove(&ProductId::new("missing")));
        assert_eq!(cart.total_quantity(), 1);
    }

    #[test]
    fn test_remove_is_unconditional() {
        let a = product("a", 10);
        let mut cart = Cart::new("ILS");
        cart.add_or_increment(&a, qty(9)).unwrap();
        assert!(cart.remove(a.id()));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_subtotal_of_two_lines() {
        let mut cart = Cart::new("ILS");
        cart.add_or_increment(&product("a", 100), qty(2)).unwrap();
        cart.add_or_increment(&product("b", 50), qty(1)).unwrap();
        assert_eq!(cart.subtotal().amount(), Decimal::new(250, 0));
        assert_eq!(cart.shipping_fee().amount(), Decimal::new(30, 0));
        assert_eq!(cart.total().amount(), Decimal::new(280, 0));
        assert_eq!(cart.amount_to_free_shipping().amount(), Decimal::new(50, 0));
    }

    #[test]
    fn test_free_shipping_boundary_is_exclusive() {
        let mut at = Cart::new("ILS");
        at.add_or_increment(&product("a", 300), Quantity::ONE).unwrap();
        assert_eq!(at.shipping_fee().amount(), Decimal::new(30, 0));
        assert_eq!(at.total().amount(), Decimal::new(330, 0));

        let mut above = Cart::new("ILS");
        above.add_or_increment(&product("a", 301), Quantity::ONE).unwrap();
        assert!(above.shipping_fee().is_zero());
        assert_eq!(above.total().amount(), Decimal::new(301, 0));
        assert!(above.amount_to_free_shipping().is_zero());
    }

    #[test]
    fn test_empty_cart_still_quotes_shipping() {
        let cart = Cart::new("ILS");
        assert!(cart.subtotal().is_zero());
        assert_eq!(cart.shipping_fee().amount(), Decimal::new(30, 0));
        assert_eq!(cart.total_quantity(), 0);
    }

    #[test]
    fn test_restore_rejects_broken_lines() {
        let line = CartLine::for_product(&product("a", 10), Quantity::ONE);
        let dup = Cart::restore("ILS", ShippingPolicy::standard(), vec![line.clone(), line.clone()]);
        assert_eq!(dup.unwrap_err(), CartError::DuplicateLine(ProductId::new("a")));

        let mut negative = line;
        negative.unit_price = Decimal::new(-1, 0);
        assert!(matches!(Cart::restore("ILS", ShippingPolicy::standard(), vec![negative]), Err(CartError::NegativePrice(_))));
    }

    #[test]
    fn test_line_quantity_is_capped() {
        let a = product("a", 10);
        let mut cart = Cart::new("ILS");
        cart.add_or_increment(&a, qty(MAX_QUANTITY_PER_LINE)).unwrap();
        let err = cart.add_or_increment(&a, Quantity::ONE).unwrap_err();
        assert_eq!(err, CartError::QuantityLimit { product_id: ProductId::new("a"), limit: MAX_QUANTITY_PER_LINE });
        assert_eq!(cart.total_quantity(), u64::from(MAX_QUANTITY_PER_LINE));

        let b = product("b", 10);
        assert!(cart.add_or_increment(&b, qty(u32::MAX)).is_err());
        assert!(cart.line(b.id()).is_none());
    }

    #[test]
    fn test_unrepresentable_total_is_rejected() {
        let mut cart = Cart::new("ILS");
        cart.add_or_increment(&product("cheap", 10), Quantity::ONE).unwrap();
        let huge = product_at("huge", Decimal::MAX);
        let err = cart.add_or_increment(&huge, qty(2)).unwrap_err();
        assert_eq!(err, CartError::AmountOverflow(Some(ProductId::new("huge"))));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total().amount(), Decimal::new(40, 0));
    }

    #[test]
    fn test_restore_rejects_unrepresentable_totals() {
        let mut line = CartLine::for_product(&product("a", 10), qty(3));
        line.unit_price = Decimal::MAX;
        assert_eq!(Cart::restore("ILS", ShippingPolicy::standard(), vec![line.clone()]).unwrap_err(), CartError::AmountOverflow(None));

        line.unit_price = Decimal::ONE;
        line.quantity = qty(MAX_QUANTITY_PER_LINE + 1);
        assert!(matches!(Cart::restore("ILS", ShippingPolicy::standard(), vec![line]), Err(CartError::QuantityLimit { .. })));
    }

    proptest! {
        #[test]
        fn prop_distinct_adds_keep_one_line_each(quantities in prop::collection::vec(1u32..=50, 0..20)) {
            let mut cart = Cart::new("ILS");
            for (i, n) in quantities.iter().enumerate() {
                cart.add_or_increment(&product(&format!("p{i}"), 10), qty(*n)).unwrap();
            }
            prop_assert_eq!(cart.lines().len(), quantities.len());
            prop_assert_eq!(cart.total_quantity(), quantities.iter().map(|n| u64::from(*n)).sum::<u64>());
            prop_assert_eq!(cart.state() == CartState::Empty, quantities.is_empty());
        }

        #[test]
        fn prop_repeated_adds_merge(adds in prop::collection::vec(1u32..=100, 1..20)) {
            let a = product("a", 7);
            let mut cart = Cart::new("ILS");
            for n in &adds {
                cart.add_or_increment(&a, qty(*n)).unwrap();
            }
            let expected: u32 = adds.iter().sum();
            prop_assert_eq!(cart.lines().len(), 1);
            prop_assert_eq!(cart.lines()[0].quantity.value(), expected);
            prop_assert_eq!(cart.subtotal().amount(), Decimal::from(expected * 7));
        }
    }
}
