//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{BadgeColor, Category, Product, ProductDraft, ProductError};
pub use order::{Customer, Order, OrderError, OrderLine, OrderSnapshot, OrderStatus, PaymentMethod};
pub use cart::{Cart, CartError, CartLine, CartState, ShippingPolicy};
