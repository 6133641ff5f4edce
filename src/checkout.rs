//! Order submission: validated customer fields plus a cart snapshot, handed to the order store.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Customer, Order, OrderSnapshot, PaymentMethod};
use crate::domain::value_objects::Money;
use crate::ledger::CartLedger;
use crate::publisher::EventPublisher;
use crate::repository::OrderRepository;
use crate::validation::failed_fields;
use crate::{Result, ShopError};

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    #[validate(custom = "crate::validation::not_blank")]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom = "crate::validation::phone_number")]
    pub phone: String,
    #[validate(custom = "crate::validation::not_blank")]
    pub address: String,
    #[validate(custom = "crate::validation::not_blank")]
    pub city: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl CheckoutForm {
    pub fn customer(&self) -> Customer {
        Customer {
            full_name: self.full_name.trim().to_string(), email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(), address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub order_id: Uuid,
    pub order_number: String,
    pub total: Money,
}

/// Places an order for the ledger's current contents.
///
/// The ledger is cleared only after the order store acknowledges the insert;
/// any failure before that leaves the cart exactly as it was.
pub async fn submit_order(
    ledger: &mut CartLedger,
    form: &CheckoutForm,
    orders: &dyn OrderRepository,
    publisher: &dyn EventPublisher,
) -> Result<OrderReceipt> {
    form.validate().map_err(|e| ShopError::Validation(failed_fields(&e)))?;
    if ledger.cart().is_empty() { return Err(ShopError::EmptyCart); }

    let snapshot = OrderSnapshot::capture(ledger.cart(), form.customer(), form.payment_method, Utc::now());
    let mut order = Order::place(snapshot);
    if let Err(e) = orders.insert(&order).await {
        tracing::warn!(key = %ledger.key(), error = %e, "order submission failed, cart kept");
        return Err(ShopError::SubmissionFailed(e.to_string()));
    }
    tracing::info!(order_id = %order.id(), order_number = order.order_number(), total = %order.total(), "order placed");

    if let Err(e) = ledger.clear() {
        tracing::error!(key = %ledger.key(), error = %e, "order placed but cart could not be cleared");
    }
    for event in order.take_events() {
        publisher.publish(&event).await;
    }
    Ok(OrderReceipt { order_id: order.id(), order_number: order.order_number().to_string(), total: order.total().clone() })
}
