//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::cart::Cart;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Money, ProductId, Quantity};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer { pub full_name: String, pub email: String, pub phone: String, pub address: String, pub city: String }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod { #[default] CashOnDelivery }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine { pub product_id: ProductId, pub name: String, pub unit_price: Decimal, pub quantity: Quantity, pub subtotal: Decimal }

/// Frozen copy of a cart and its totals at checkout time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    customer: Customer,
    items: Vec<OrderLine>,
    subtotal: Money,
    shipping: Money,
    total: Money,
    payment_method: PaymentMethod,
    captured_at: DateTime<Utc>,
}

impl OrderSnapshot {
    pub fn capture(cart: &Cart, customer: Customer, payment_method: PaymentMethod, captured_at: DateTime<Utc>) -> Self {
        let items = cart.lines().iter().map(|l| OrderLine {
            product_id: l.product_id.clone(), name: l.name.clone(), unit_price: l.unit_price,
            quantity: l.quantity, subtotal: cart.line_total(l).amount(),
        }).collect();
        Self {
            customer, items, subtotal: cart.subtotal(), shipping: cart.shipping_fee(), total: cart.total(),
            payment_method, captured_at,
        }
    }

    pub fn customer(&self) -> &Customer { &self.customer }
    pub fn items(&self) -> &[OrderLine] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn shipping(&self) -> &Money { &self.shipping }
    pub fn total(&self) -> &Money { &self.total }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn captured_at(&self) -> DateTime<Utc> { self.captured_at }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending", Self::Confirmed => "confirmed", Self::Processing => "processing",
            Self::Shipped => "shipped", Self::Delivered => "delivered", Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "pending" => Self::Pending, "confirmed" => Self::Confirmed, "processing" => Self::Processing,
            "shipped" => Self::Shipped, "delivered" => Self::Delivered, "cancelled" => Self::Cancelled,
            _ => return None,
        })
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Confirmed, Processing) | (Processing, Shipped) | (Shipped, Delivered)
                | (Pending | Confirmed | Processing, Cancelled)
        )
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: Uuid,
    order_number: String,
    snapshot: OrderSnapshot,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Order {
    pub fn place(snapshot: OrderSnapshot) -> Self {
        let id = Uuid::now_v7();
        let order_number = format!("ORD-{:08}", rand::random::<u32>() % 100_000_000);
        let now = Utc::now();
        let mut order = Self {
            id, order_number: order_number.clone(), snapshot, status: OrderStatus::Pending,
            created_at: now, updated_at: now, events: vec![],
        };
        let total = order.snapshot.total.amount();
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: id, order_number, total }));
        order
    }

    /// Rebuilds an order from persisted fields without raising events.
    pub fn restore(id: Uuid, order_number: String, snapshot: OrderSnapshot, status: OrderStatus, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self { id, order_number, snapshot, status, created_at, updated_at, events: vec![] }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn snapshot(&self) -> &OrderSnapshot { &self.snapshot }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn total(&self) -> &Money { self.snapshot.total() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn change_status(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { from: self.status, to: next });
        }
        let from = std::mem::replace(&mut self.status, next);
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: next }));
        Ok(())
    }

    pub fn confirm(&mut self) -> Result<(), OrderError> { self.change_status(OrderStatus::Confirmed) }
    pub fn cancel(&mut self) -> Result<(), OrderError> { self.change_status(OrderStatus::Cancelled) }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { InvalidTransition { from: OrderStatus, to: OrderStatus } }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::InvalidTransition { from, to } => write!(f, "Cannot move order from {} to {}", from.as_str(), to.as_str()) }
    }
}
