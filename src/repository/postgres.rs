//! PostgreSQL-backed repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AdminUser, CatalogQuery, OrderQuery, OrderRepository, ProductRepository, UserRepository};
use crate::domain::aggregates::{BadgeColor, Category, Order, OrderSnapshot, OrderStatus, Product};
use crate::domain::value_objects::ProductId;
use crate::{Result, ShopError};

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

/// `ILIKE` pattern matching `term` literally anywhere in the column.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') { pattern.push('\\'); }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String, name: String, subtitle: String, category: String, price: Decimal,
    original_price: Option<Decimal>, discount: Option<i32>, image: String, description: String,
    badge: String, badge_color: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = ShopError;

    fn try_from(r: ProductRow) -> Result<Self> {
        let category = Category::parse(&r.category).ok_or_else(|| ShopError::DataCorruption(format!("unknown category {}", r.category)))?;
        let badge_color = BadgeColor::parse(&r.badge_color).ok_or_else(|| ShopError::DataCorruption(format!("unknown badge color {}", r.badge_color)))?;
        let discount = r.discount.map(u32::try_from).transpose().map_err(|_| ShopError::DataCorruption("negative discount".into()))?;
        Ok(Product::restore(
            ProductId::new(r.id), r.name, r.subtitle, category, r.price, r.original_price, discount,
            r.image, r.description, r.badge, badge_color, r.created_at, r.updated_at,
        ))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid, order_number: String, snapshot: Json<OrderSnapshot>, status: String,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = ShopError;

    fn try_from(r: OrderRow) -> Result<Self> {
        let status = OrderStatus::parse(&r.status).ok_or_else(|| ShopError::DataCorruption(format!("unknown order status {}", r.status)))?;
        Ok(Order::restore(r.id, r.order_number, r.snapshot.0, status, r.created_at, r.updated_at))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow { id: Uuid, username: String, password_hash: String, created_at: DateTime<Utc> }

impl From<UserRow> for AdminUser {
    fn from(r: UserRow) -> Self { Self { id: r.id, username: r.username, password_hash: r.password_hash, created_at: r.created_at } }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn list(&self, query: &CatalogQuery) -> Result<Vec<Product>> {
        let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(contains_pattern);
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT * FROM products WHERE ($1::text IS NULL OR category = $1) AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2) ORDER BY created_at DESC",
        )
        .bind(query.category.as_ref().map(Category::as_str)).bind(search)
        .fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get(&self, id: &ProductId) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1").bind(id.as_str())
            .fetch_optional(&self.pool).await?.map(TryInto::try_into).transpose()
    }

    async fn insert(&self, p: &Product) -> Result<()> {
        sqlx::query("INSERT INTO products (id, name, subtitle, category, price, original_price, discount, image, description, badge, badge_color, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)")
            .bind(p.id().as_str()).bind(p.name()).bind(p.subtitle()).bind(p.category().as_str()).bind(p.price())
            .bind(p.original_price()).bind(p.discount().map(|d| d as i32)).bind(p.image()).bind(p.description())
            .bind(p.badge()).bind(p.badge_color().as_str()).bind(p.created_at()).bind(p.updated_at())
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn update(&self, p: &Product) -> Result<()> {
        let done = sqlx::query("UPDATE products SET name = $2, subtitle = $3, category = $4, price = $5, original_price = $6, discount = $7, image = $8, description = $9, badge = $10, badge_color = $11, updated_at = $12 WHERE id = $1")
            .bind(p.id().as_str()).bind(p.name()).bind(p.subtitle()).bind(p.category().as_str()).bind(p.price())
            .bind(p.original_price()).bind(p.discount().map(|d| d as i32)).bind(p.image()).bind(p.description())
            .bind(p.badge()).bind(p.badge_color().as_str()).bind(p.updated_at())
            .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(ShopError::ProductNotFound); }
        Ok(())
    }

    async fn delete(&self, id: &ProductId) -> Result<()> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1").bind(id.as_str()).execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(ShopError::ProductNotFound); }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert(&self, o: &Order) -> Result<()> {
        sqlx::query("INSERT INTO orders (id, order_number, snapshot, total, status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(o.id()).bind(o.order_number()).bind(Json(o.snapshot())).bind(o.total().amount())
            .bind(o.status().as_str()).bind(o.created_at()).bind(o.updated_at())
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT id, order_number, snapshot, status, created_at, updated_at FROM orders ORDER BY created_at DESC")
            .fetch_all(&self.pool).await?;
        let orders = rows.into_iter().map(TryInto::try_into).collect::<Result<Vec<Order>>>()?;
        Ok(query.apply(orders))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT id, order_number, snapshot, status, created_at, updated_at FROM orders WHERE id = $1").bind(id)
            .fetch_optional(&self.pool).await?.map(TryInto::try_into).transpose()
    }

    async fn update_status(&self, o: &Order) -> Result<()> {
        let done = sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(o.id()).bind(o.status().as_str()).bind(o.updated_at())
            .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(ShopError::OrderNotFound); }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let done = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(ShopError::OrderNotFound); }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn list(&self) -> Result<Vec<AdminUser>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM admin_users ORDER BY created_at").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM admin_users WHERE username = $1").bind(username)
            .fetch_optional(&self.pool).await?;
        Ok(row.map(Into::into))
    }

    async fn insert(&self, u: &AdminUser) -> Result<()> {
        sqlx::query("INSERT INTO admin_users (id, username, password_hash, created_at) VALUES ($1, $2, $3, $4)")
            .bind(u.id).bind(&u.username).bind(&u.password_hash).bind(u.created_at)
            .execute(&self.pool).await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => ShopError::UserExists,
                other => other.into(),
            })?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let done = sqlx::query("DELETE FROM admin_users WHERE id = $1").bind(id).execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(ShopError::UserNotFound); }
        Ok(())
    }
}
