//! HTTP surface: storefront catalog, cart and checkout, plus the admin area.

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::{header::AUTHORIZATION, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::auth::{self, LoginForm, NewUserForm, Session, SessionManager};
use crate::checkout::{self, CheckoutForm, OrderReceipt};
use crate::domain::aggregates::{Cart, CartLine, CartState, Order, OrderStatus, Product, ProductDraft, ShippingPolicy};
use crate::domain::events::{DomainEvent, OrderEvent, ProductEvent};
use crate::ledger::CartLedger;
use crate::publisher::EventPublisher;
use crate::repository::{AdminUser, CatalogQuery, OrderQuery, OrderRepository, ProductRepository, UserRepository};
use crate::storage::CartStorage;
use crate::{Money, ProductId, Quantity, ShopError};

type ApiResult<T> = Result<T, ShopError>;

#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub users: Arc<dyn UserRepository>,
    pub carts: Arc<dyn CartStorage>,
    pub sessions: Arc<SessionManager>,
    pub publisher: Arc<dyn EventPublisher>,
    pub currency: String,
    pub shipping: ShippingPolicy,
}

impl AppState {
    /// Opens the ledger for a browsing session id taken from the URL.
    fn ledger(&self, session: &str) -> ApiResult<CartLedger> {
        let valid = !session.is_empty() && session.len() <= 64 && session.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid { return Err(ShopError::Validation(vec!["session".into()])); }
        Ok(CartLedger::open(self.carts.clone(), format!("cart-{session}"), &self.currency, self.shipping.clone()))
    }

    async fn publish_all(&self, events: Vec<DomainEvent>) {
        for e in events { self.publisher.publish(&e).await; }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "perfume-shop"})) }))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/:id", get(get_product))
        .route("/api/v1/cart/:session", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/:session/items", post(add_to_cart))
        .route("/api/v1/cart/:session/items/:product_id", axum::routing::delete(remove_from_cart))
        .route("/api/v1/cart/:session/items/:product_id/decrement", post(decrement_item))
        .route("/api/v1/checkout/:session", post(place_order))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/admin/products", post(create_product))
        .route("/api/v1/admin/products/:id", put(update_product).delete(delete_product))
        .route("/api/v1/admin/orders", get(list_orders))
        .route("/api/v1/admin/orders/:id", get(get_order).delete(delete_order))
        .route("/api/v1/admin/orders/:id/status", put(update_order_status))
        .route("/api/v1/admin/users", get(list_users).post(create_user))
        .route("/api/v1/admin/users/:id", axum::routing::delete(delete_user))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

// =============================================================================
// Errors and extractors
// =============================================================================

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::ProductNotFound | Self::OrderNotFound | Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::UserExists | Self::Order(_) => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) | Self::Product(_) | Self::Cart(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::SubmissionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) | Self::Database(_) | Self::DataCorruption(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let fields = match &self { Self::Validation(f) => f.clone(), _ => vec![] };
        (status, Json(serde_json::json!({"error": self.to_string(), "fields": fields}))).into_response()
    }
}

/// A verified admin session from the `Authorization: Bearer` header.
pub struct AdminSession(pub Session);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts.headers.get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ShopError::Unauthorized("missing bearer token".into()))?;
        state.sessions.verify(token.trim()).map(AdminSession)
    }
}

// =============================================================================
// Storefront
// =============================================================================

async fn list_products(State(s): State<AppState>, Query(q): Query<CatalogQuery>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(s.products.list(&q).await?))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Product>> {
    s.products.get(&ProductId::new(id)).await?.map(Json).ok_or(ShopError::ProductNotFound)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub state: CartState,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub total: Money,
    pub total_quantity: u64,
    pub amount_to_free_shipping: Money,
}

impl From<&Cart> for CartView {
    fn from(c: &Cart) -> Self {
        Self {
            lines: c.lines().to_vec(), state: c.state(), subtotal: c.subtotal(), shipping_fee: c.shipping_fee(),
            total: c.total(), total_quantity: c.total_quantity(), amount_to_free_shipping: c.amount_to_free_shipping(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest { pub product_id: ProductId, pub quantity: Option<u32> }

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> ApiResult<Json<CartView>> {
    Ok(Json(CartView::from(s.ledger(&session)?.cart())))
}

async fn add_to_cart(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<AddToCartRequest>) -> ApiResult<Json<CartView>> {
    let qty = Quantity::new(r.quantity.unwrap_or(1)).ok_or_else(|| ShopError::Validation(vec!["quantity".into()]))?;
    let product = s.products.get(&r.product_id).await?.ok_or(ShopError::ProductNotFound)?;
    let mut ledger = s.ledger(&session)?;
    ledger.add_or_increment(&product, qty)?;
    Ok(Json(CartView::from(ledger.cart())))
}

async fn decrement_item(State(s): State<AppState>, Path((session, product_id)): Path<(String, String)>) -> ApiResult<Json<CartView>> {
    let mut ledger = s.ledger(&session)?;
    ledger.decrement(&ProductId::new(product_id))?;
    Ok(Json(CartView::from(ledger.cart())))
}

async fn remove_from_cart(State(s): State<AppState>, Path((session, product_id)): Path<(String, String)>) -> ApiResult<Json<CartView>> {
    let mut ledger = s.ledger(&session)?;
    ledger.remove(&ProductId::new(product_id))?;
    Ok(Json(CartView::from(ledger.cart())))
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> ApiResult<StatusCode> {
    s.ledger(&session)?.clear()?;
    Ok(StatusCode::NO_CONTENT)
}

async fn place_order(State(s): State<AppState>, Path(session): Path<String>, Json(form): Json<CheckoutForm>) -> ApiResult<(StatusCode, Json<OrderReceipt>)> {
    let mut ledger = s.ledger(&session)?;
    let receipt = checkout::submit_order(&mut ledger, &form, s.orders.as_ref(), s.publisher.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

// =============================================================================
// Auth
// =============================================================================

async fn login(State(s): State<AppState>, Json(form): Json<LoginForm>) -> ApiResult<Json<Session>> {
    Ok(Json(s.sessions.login(s.users.as_ref(), &form).await?))
}

async fn logout(State(s): State<AppState>, AdminSession(session): AdminSession) -> ApiResult<StatusCode> {
    s.sessions.revoke(&session.token)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Admin
// =============================================================================

async fn create_product(State(s): State<AppState>, AdminSession(_): AdminSession, Json(draft): Json<ProductDraft>) -> ApiResult<(StatusCode, Json<Product>)> {
    let mut product = Product::create(draft)?;
    s.products.insert(&product).await?;
    s.publish_all(product.take_events()).await;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(State(s): State<AppState>, AdminSession(_): AdminSession, Path(id): Path<String>, Json(draft): Json<ProductDraft>) -> ApiResult<Json<Product>> {
    let mut product = s.products.get(&ProductId::new(id)).await?.ok_or(ShopError::ProductNotFound)?;
    product.update(draft)?;
    s.products.update(&product).await?;
    s.publish_all(product.take_events()).await;
    Ok(Json(product))
}

async fn delete_product(State(s): State<AppState>, AdminSession(_): AdminSession, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let product_id = ProductId::new(id);
    s.products.delete(&product_id).await?;
    s.publish_all(vec![DomainEvent::Product(ProductEvent::Deleted { product_id })]).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_orders(State(s): State<AppState>, AdminSession(_): AdminSession, Query(q): Query<OrderQuery>) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(s.orders.list(&q).await?))
}

async fn get_order(State(s): State<AppState>, AdminSession(_): AdminSession, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    s.orders.get(id).await?.map(Json).ok_or(ShopError::OrderNotFound)
}

#[derive(Debug, Deserialize)]
pub struct StatusChange { pub status: OrderStatus }

async fn update_order_status(State(s): State<AppState>, AdminSession(admin): AdminSession, Path(id): Path<Uuid>, Json(r): Json<StatusChange>) -> ApiResult<Json<Order>> {
    let mut order = s.orders.get(id).await?.ok_or(ShopError::OrderNotFound)?;
    order.change_status(r.status)?;
    s.orders.update_status(&order).await?;
    tracing::info!(order_id = %id, status = r.status.as_str(), by = %admin.username, "order status changed");
    s.publish_all(order.take_events()).await;
    Ok(Json(order))
}

async fn delete_order(State(s): State<AppState>, AdminSession(admin): AdminSession, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    s.orders.delete(id).await?;
    tracing::info!(order_id = %id, by = %admin.username, "order deleted");
    s.publish_all(vec![DomainEvent::Order(OrderEvent::Deleted { order_id: id })]).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_users(State(s): State<AppState>, AdminSession(_): AdminSession) -> ApiResult<Json<Vec<AdminUser>>> {
    Ok(Json(s.users.list().await?))
}

async fn create_user(State(s): State<AppState>, AdminSession(_): AdminSession, Json(form): Json<NewUserForm>) -> ApiResult<(StatusCode, Json<AdminUser>)> {
    Ok((StatusCode::CREATED, Json(auth::create_user(s.users.as_ref(), &form).await?)))
}

async fn delete_user(State(s): State<AppState>, AdminSession(admin): AdminSession, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    auth::delete_user(s.users.as_ref(), id, &admin).await?;
    Ok(StatusCode::NO_CONTENT)
}
