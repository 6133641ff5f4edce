//! Persistence seams for the catalog, orders and admin users.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{Category, Order, Product};
use crate::domain::value_objects::ProductId;
use crate::Result;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Newest first.
    async fn list(&self, query: &CatalogQuery) -> Result<Vec<Product>>;
    async fn get(&self, id: &ProductId) -> Result<Option<Product>>;
    async fn insert(&self, product: &Product) -> Result<()>;
    async fn update(&self, product: &Product) -> Result<()>;
    async fn delete(&self, id: &ProductId) -> Result<()>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<()>;
    async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>>;
    async fn get(&self, id: Uuid) -> Result<Option<Order>>;
    async fn update_status(&self, order: &Order) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<AdminUser>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>>;
    /// Fails with `ShopError::UserExists` on a duplicate username.
    async fn insert(&self, user: &AdminUser) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Catalog filter. A missing category means every category; the search term
/// matches name or description, case-insensitively.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<Category>,
    pub search: Option<String>,
}

impl CatalogQuery {
    pub fn matches(&self, product: &Product) -> bool {
        let category_ok = self.category.as_ref().map_or(true, |c| product.category() == c);
        let search_ok = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                product.name().to_lowercase().contains(&term) || product.description().to_lowercase().contains(&term)
            }
            _ => true,
        };
        category_ok && search_ok
    }

    pub fn apply(&self, mut products: Vec<Product>) -> Vec<Product> {
        products.retain(|p| self.matches(p));
        products.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        products
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderSort { #[default] DateDesc, DateAsc, TotalDesc, TotalAsc }

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub sort: OrderSort,
}

impl OrderQuery {
    /// Case-insensitive match on customer name, email, phone or city.
    pub fn matches(&self, order: &Order) -> bool {
        let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) else { return true };
        let term = term.to_lowercase();
        let c = order.snapshot().customer();
        [&c.full_name, &c.email, &c.phone, &c.city].iter().any(|f| f.to_lowercase().contains(&term))
    }

    pub fn apply(&self, mut orders: Vec<Order>) -> Vec<Order> {
        orders.retain(|o| self.matches(o));
        match self.sort {
            OrderSort::DateDesc => orders.sort_by(|a, b| b.created_at().cmp(&a.created_at())),
            OrderSort::DateAsc => orders.sort_by(|a, b| a.created_at().cmp(&b.created_at())),
            OrderSort::TotalDesc => orders.sort_by(|a, b| b.total().amount().cmp(&a.total().amount())),
            OrderSort::TotalAsc => orders.sort_by(|a, b| a.total().amount().cmp(&b.total().amount())),
        }
        orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{BadgeColor, Cart, Customer, OrderSnapshot, PaymentMethod};
    use crate::domain::value_objects::Quantity;
    use crate::testing::{customer, product, product_in};
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn order(name: &str, city: &str, price: i64, age_minutes: i64) -> Order {
        let mut cart = Cart::new("ILS");
        cart.add_or_increment(&product("p", price), Quantity::ONE).unwrap();
        let customer = Customer { full_name: name.into(), city: city.into(), ..customer() };
        let snapshot = OrderSnapshot::capture(&cart, customer, PaymentMethod::CashOnDelivery, Utc::now());
        let at = Utc::now() - Duration::minutes(age_minutes);
        let placed = Order::place(snapshot.clone());
        Order::restore(placed.id(), placed.order_number().into(), snapshot, placed.status(), at, at)
    }

    #[test]
    fn test_catalog_query_filters_by_category_and_name() {
        let products = vec![product_in("lotus", "Lotus Flower", Category::Women), product_in("oud", "Royal Oud", Category::Men)];
        let women = CatalogQuery { category: Some(Category::Women), search: None };
        assert_eq!(women.apply(products.clone()).len(), 1);

        let search = CatalogQuery { category: None, search: Some("  OUD ".into()) };
        let found = search.apply(products.clone());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id().as_str(), "oud");

        assert_eq!(CatalogQuery::default().apply(products).len(), 2);
    }

    #[test]
    fn test_catalog_search_reads_descriptions() {
        let now = Utc::now();
        let lotus = Product::restore(
            ProductId::new("lotus"), "Lotus Flower".into(), String::new(), Category::Women, Decimal::ONE_HUNDRED, None, None,
            "https://cdn.example.com/lotus.jpg".into(), "Jasmine heart over white musk".into(), "New".into(), BadgeColor::Amber, now, now,
        );
        let products = vec![lotus, product_in("oud", "Royal Oud", Category::Men)];

        let found = CatalogQuery { category: None, search: Some("jasmine".into()) }.apply(products.clone());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id().as_str(), "lotus");
        assert!(CatalogQuery { category: None, search: Some("50%".into()) }.apply(products).is_empty());
    }

    #[test]
    fn test_order_query_search() {
        let orders = vec![order("Sara Levi", "Haifa", 100, 1), order("Omar Haddad", "Nazareth", 200, 2)];
        let q = OrderQuery { search: Some("nazareth".into()), sort: OrderSort::default() };
        let found = q.apply(orders.clone());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].snapshot().customer().full_name, "Omar Haddad");
        assert_eq!(OrderQuery { search: Some("levi".into()), ..Default::default() }.apply(orders.clone()).len(), 1);
        assert_eq!(OrderQuery { search: Some("sara@example".into()), ..Default::default() }.apply(orders).len(), 2);
    }

    #[test]
    fn test_order_query_sorting() {
        let orders = vec![order("a", "x", 100, 10), order("b", "x", 400, 5), order("c", "x", 250, 1)];
        let names = |q: OrderQuery| q.apply(orders.clone()).iter().map(|o| o.snapshot().customer().full_name.clone()).collect::<Vec<_>>();
        assert_eq!(names(OrderQuery::default()), ["c", "b", "a"]);
        assert_eq!(names(OrderQuery { sort: OrderSort::DateAsc, search: None }), ["a", "b", "c"]);
        assert_eq!(names(OrderQuery { sort: OrderSort::TotalDesc, search: None }), ["b", "c", "a"]);
        assert_eq!(names(OrderQuery { sort: OrderSort::TotalAsc, search: None }), ["a", "c", "b"]);
        assert_eq!(orders[1].total().amount(), Decimal::new(400, 0));
    }

    #[test]
    fn test_order_sort_parses_kebab_case() {
        let q: OrderQuery = serde_json::from_str(r#"{"sort":"total-desc"}"#).unwrap();
        assert_eq!(q.sort, OrderSort::TotalDesc);
    }
}
