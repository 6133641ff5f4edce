//! Cart ledger: a [`Cart`] bound to the storage key it is persisted under.
//!
//! Every mutation writes the full line list back to storage before returning.
//! Unreadable persisted state is discarded and the session starts with an empty cart.

use std::sync::Arc;

use crate::domain::aggregates::{Cart, CartLine, Product, ShippingPolicy};
use crate::domain::value_objects::{Money, ProductId, Quantity};
use crate::storage::{CartStorage, StorageError};

pub const DEFAULT_CART_KEY: &str = "cart";

pub struct CartLedger {
    cart: Cart,
    key: String,
    storage: Arc<dyn CartStorage>,
}

impl CartLedger {
    /// Restores the cart stored under `key`, or starts empty.
    pub fn open(storage: Arc<dyn CartStorage>, key: impl Into<String>, currency: &str, shipping: ShippingPolicy) -> Self {
        let key = key.into();
        let cart = match storage.load(&key) {
            Ok(Some(payload)) => match decode(&payload, currency, &shipping) {
                Ok(cart) => cart,
                Err(reason) => {
                    tracing::warn!(key = %key, %reason, "discarding malformed persisted cart");
                    if let Err(e) = storage.remove(&key) {
                        tracing::warn!(key = %key, error = %e, "failed to drop malformed cart");
                    }
                    Cart::with_policy(currency, shipping)
                }
            },
            Ok(None) => Cart::with_policy(currency, shipping),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cart storage unreadable, starting empty");
                Cart::with_policy(currency, shipping)
            }
        };
        Self { cart, key, storage }
    }

    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn key(&self) -> &str { &self.key }

    /// Cart rule violations leave both the cart and storage untouched.
    pub fn add_or_increment(&mut self, product: &Product, qty: Quantity) -> crate::Result<()> {
        self.cart.add_or_increment(product, qty)?;
        tracing::debug!(key = %self.key, product_id = %product.id(), qty = qty.value(), "cart add");
        Ok(self.persist()?)
    }

    /// `Ok(false)` when the product was not in the cart; nothing is written then.
    pub fn decrement(&mut self, product_id: &ProductId) -> Result<bool, StorageError> {
        if !self.cart.decrement(product_id) { return Ok(false); }
        self.persist().map(|_| true)
    }

    pub fn remove(&mut self, product_id: &ProductId) -> Result<bool, StorageError> {
        if !self.cart.remove(product_id) { return Ok(false); }
        self.persist().map(|_| true)
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.cart.clear();
        self.storage.remove(&self.key)
    }

    pub fn subtotal(&self) -> Money { self.cart.subtotal() }
    pub fn shipping_fee(&self) -> Money { self.cart.shipping_fee() }
    pub fn total(&self) -> Money { self.cart.total() }
    pub fn total_quantity(&self) -> u64 { self.cart.total_quantity() }

    fn persist(&self) -> Result<(), StorageError> {
        if self.cart.is_empty() { return self.storage.remove(&self.key); }
        let payload = serde_json::to_string(self.cart.lines())?;
        self.storage.save(&self.key, &payload)
    }
}

fn decode(payload: &str, currency: &str, shipping: &ShippingPolicy) -> Result<Cart, String> {
    let lines: Vec<CartLine> = serde_json::from_str(payload).map_err(|e| e.to_string())?;
    Cart::restore(currency, shipping.clone(), lines).map_err(|e| e.to_string())
}
