//! Perfume shop storefront and admin service
//!
//! ## Features
//! - Product catalog with category filter and name search
//! - Shopping cart ledger persisted on every change
//! - Checkout snapshotting the cart into an order
//! - Admin product, order and user management behind expiring sessions

pub mod api;
pub mod auth;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod ledger;
pub mod publisher;
pub mod repository;
pub mod storage;
pub mod validation;

use thiserror::Error;

pub use domain::aggregates::{Cart, CartLine, Order, OrderSnapshot, Product};
pub use domain::value_objects::{Money, ProductId, Quantity};
pub use ledger::CartLedger;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Username already taken")]
    UserExists,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid input: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Product(#[from] domain::aggregates::ProductError),

    #[error(transparent)]
    Order(#[from] domain::aggregates::OrderError),

    #[error(transparent)]
    Cart(#[from] domain::aggregates::CartError),

    #[error("Order submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    DataCorruption(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ShopError>;
