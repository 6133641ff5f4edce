//! Value Objects for the shop

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque catalog identifier. The cart only compares it for identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn generate() -> Self { Self(uuid::Uuid::now_v7().to_string()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self { Self::new(value) }
}

/// Money value object. Arithmetic is checked: amounts never wrap or panic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_zero(&self) -> bool { self.amount.is_zero() }

    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(self.currency.clone(), other.currency.clone()));
        }
        self.amount.checked_add(other.amount).map(|a| Money::new(a, &self.currency)).ok_or(MoneyError::Overflow)
    }

    pub fn checked_mul(&self, qty: Quantity) -> Result<Money, MoneyError> {
        self.amount.checked_mul(Decimal::from(qty.value())).map(|a| Money::new(a, &self.currency)).ok_or(MoneyError::Overflow)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.amount, self.currency) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("currency mismatch: {0} vs {1}")]
    CurrencyMismatch(String, String),

    #[error("amount out of range")]
    Overflow,
}

/// Line quantity. Never zero: a line that would reach zero is removed instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> Option<Self> { (value > 0).then_some(Self(value)) }
    pub fn value(&self) -> u32 { self.0 }
    /// `None` when the sum does not fit in a `u32`.
    pub fn checked_add(&self, other: Quantity) -> Option<Self> { self.0.checked_add(other.0).map(Self) }
    /// `None` once the quantity would drop to zero.
    pub fn decrement(&self) -> Option<Self> { Self::new(self.0 - 1) }
}

impl Default for Quantity { fn default() -> Self { Self::ONE } }

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value).ok_or(QuantityError::Zero) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { Zero }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "quantity must be at least 1") }
}
