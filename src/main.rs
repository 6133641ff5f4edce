//! Perfume shop - storefront and admin API

use anyhow::Result;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use perfume_shop::api::{self, AppState};
use perfume_shop::auth::{self, NewUserForm, SessionManager};
use perfume_shop::config::Config;
use perfume_shop::domain::aggregates::ShippingPolicy;
use perfume_shop::publisher::{EventPublisher, NatsPublisher, NoopPublisher};
use perfume_shop::repository::{memory::MemoryStore, postgres::PgStore, OrderRepository, ProductRepository, UserRepository};
use perfume_shop::storage::FileStorage;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let (products, orders, users): (Arc<dyn ProductRepository>, Arc<dyn OrderRepository>, Arc<dyn UserRepository>) = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            let store = Arc::new(PgStore::new(db));
            (store.clone() as Arc<dyn ProductRepository>, store.clone() as Arc<dyn OrderRepository>, store as Arc<dyn UserRepository>)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn ProductRepository>, store.clone() as Arc<dyn OrderRepository>, store as Arc<dyn UserRepository>)
        }
    };

    let publisher: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match NatsPublisher::connect(url).await {
            Ok(p) => Arc::new(p),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events will be dropped");
                Arc::new(NoopPublisher)
            }
        },
        None => Arc::new(NoopPublisher),
    };

    if let Some((username, password)) = &config.bootstrap_admin {
        if users.find_by_username(username).await?.is_none() {
            let form = NewUserForm { username: username.clone(), password: password.clone(), confirm_password: password.clone() };
            auth::create_user(users.as_ref(), &form).await?;
        }
    }

    let state = AppState {
        products, orders, users,
        carts: Arc::new(FileStorage::open(&config.cart_dir)?),
        sessions: Arc::new(SessionManager::new(Duration::minutes(config.session_ttl_minutes))),
        publisher,
        currency: config.currency.clone(),
        shipping: ShippingPolicy::standard(),
    };

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, currency = %config.currency, "perfume shop listening");
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, api::router(state)).await?;
    Ok(())
}
