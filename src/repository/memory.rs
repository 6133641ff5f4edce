//! In-process store, used when no database is configured and in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AdminUser, CatalogQuery, OrderQuery, OrderRepository, ProductRepository, UserRepository};
use crate::domain::aggregates::{Order, Product};
use crate::domain::value_objects::ProductId;
use crate::{Result, ShopError};

#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<HashMap<ProductId, Product>>,
    orders: RwLock<HashMap<Uuid, Order>>,
    users: RwLock<HashMap<Uuid, AdminUser>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list(&self, query: &CatalogQuery) -> Result<Vec<Product>> {
        Ok(query.apply(self.products.read().await.values().cloned().collect()))
    }

    async fn get(&self, id: &ProductId) -> Result<Option<Product>> { Ok(self.products.read().await.get(id).cloned()) }

    async fn insert(&self, product: &Product) -> Result<()> {
        self.products.write().await.insert(product.id().clone(), product.clone());
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<()> {
        let mut products = self.products.write().await;
        let slot = products.get_mut(product.id()).ok_or(ShopError::ProductNotFound)?;
        *slot = product.clone();
        Ok(())
    }

    async fn delete(&self, id: &ProductId) -> Result<()> {
        self.products.write().await.remove(id).map(|_| ()).ok_or(ShopError::ProductNotFound)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        self.orders.write().await.insert(order.id(), order.clone());
        Ok(())
    }

    async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>> {
        Ok(query.apply(self.orders.read().await.values().cloned().collect()))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>> { Ok(self.orders.read().await.get(&id).cloned()) }

    async fn update_status(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        let slot = orders.get_mut(&order.id()).ok_or(ShopError::OrderNotFound)?;
        *slot = order.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.orders.write().await.remove(&id).map(|_| ()).ok_or(ShopError::OrderNotFound)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<AdminUser>> {
        let mut users: Vec<AdminUser> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        Ok(self.users.read().await.values().find(|u| u.username == username).cloned())
    }

    async fn insert(&self, user: &AdminUser) -> Result<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) { return Err(ShopError::UserExists); }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.users.write().await.remove(&id).map(|_| ()).ok_or(ShopError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::product;
    use chrono::Utc;

    #[tokio::test]
    async fn test_product_crud() {
        let store = MemoryStore::new();
        let p = product("oud", 450);
        ProductRepository::insert(&store, &p).await.unwrap();
        assert!(ProductRepository::get(&store, p.id()).await.unwrap().is_some());
        store.update(&p).await.unwrap();
        ProductRepository::delete(&store, p.id()).await.unwrap();
        assert!(matches!(ProductRepository::delete(&store, p.id()).await, Err(ShopError::ProductNotFound)));
        assert!(matches!(store.update(&p).await, Err(ShopError::ProductNotFound)));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        let user = AdminUser { id: Uuid::now_v7(), username: "admin".into(), password_hash: "h".into(), created_at: Utc::now() };
        UserRepository::insert(&store, &user).await.unwrap();
        let dup = AdminUser { id: Uuid::now_v7(), ..user.clone() };
        assert!(matches!(UserRepository::insert(&store, &dup).await, Err(ShopError::UserExists)));
        assert_eq!(store.find_by_username("admin").await.unwrap().unwrap().id, user.id);
    }
}
