//! Domain events
use crate::domain::aggregates::order::OrderStatus;
use crate::domain::value_objects::ProductId;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: ProductId, name: String },
    Updated { product_id: ProductId },
    Deleted { product_id: ProductId },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, order_number: String, total: Decimal },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    Deleted { order_id: Uuid },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::Created { .. }) => "shop.product.created",
            Self::Product(ProductEvent::Updated { .. }) => "shop.product.updated",
            Self::Product(ProductEvent::Deleted { .. }) => "shop.product.deleted",
            Self::Order(OrderEvent::Placed { .. }) => "shop.order.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "shop.order.status_changed",
            Self::Order(OrderEvent::Deleted { .. }) => "shop.order.deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_and_payload() {
        let e = DomainEvent::Product(ProductEvent::Deleted { product_id: ProductId::new("p-1") });
        assert_eq!(e.subject(), "shop.product.deleted");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "deleted");
        assert_eq!(json["product_id"], "p-1");
    }
}
