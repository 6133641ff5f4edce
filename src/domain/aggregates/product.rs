//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::ProductId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category { Women, Men }

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Women => "women", Self::Men => "men" }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value { "women" => Some(Self::Women), "men" => Some(Self::Men), _ => None }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeColor { #[default] Amber, Red, Green, Blue, Purple, Indigo, Pink }

impl BadgeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amber => "amber", Self::Red => "red", Self::Green => "green", Self::Blue => "blue",
            Self::Purple => "purple", Self::Indigo => "indigo", Self::Pink => "pink",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "amber" => Self::Amber, "red" => Self::Red, "green" => Self::Green, "blue" => Self::Blue,
            "purple" => Self::Purple, "indigo" => Self::Indigo, "pink" => Self::Pink,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: ProductId,
    name: String,
    subtitle: String,
    category: Category,
    price: Decimal,
    original_price: Option<Decimal>,
    discount: Option<u32>,
    image: String,
    description: String,
    badge: String,
    badge_color: BadgeColor,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Admin input for creating or editing a product.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[validate(custom = "crate::validation::not_blank")]
    pub name: String,
    #[serde(default)]
    pub subtitle: String,
    pub category: Category,
    #[validate(custom = "positive_price")]
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[validate(url)]
    pub image: String,
    #[validate(custom = "crate::validation::not_blank")]
    pub description: String,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub badge_color: BadgeColor,
}

fn positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_positive() && !price.is_zero() { Ok(()) } else { Err(ValidationError::new("positive")) }
}

impl ProductDraft {
    /// Whole-percent discount when the original price exceeds the selling price.
    pub fn discount(&self) -> Option<u32> {
        let original = self.original_price.filter(|o| *o > self.price)?;
        let pct = (Decimal::ONE - self.price / original) * Decimal::ONE_HUNDRED;
        pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero).to_u32()
    }

    pub fn badge(&self) -> String {
        match (self.badge.as_deref().map(str::trim), self.discount()) {
            (Some(b), _) if !b.is_empty() => b.to_string(),
            (_, Some(d)) => format!("{d}% off"),
            _ => "New".to_string(),
        }
    }
}

impl Product {
    pub fn create(draft: ProductDraft) -> Result<Self, ProductError> {
        draft.validate().map_err(ProductError::Invalid)?;
        let id = ProductId::generate();
        let now = Utc::now();
        let mut product = Self {
            id: id.clone(), name: String::new(), subtitle: String::new(), category: draft.category.clone(),
            price: Decimal::ZERO, original_price: None, discount: None, image: String::new(),
            description: String::new(), badge: String::new(), badge_color: BadgeColor::default(),
            created_at: now, updated_at: now, events: vec![],
        };
        product.apply(draft);
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: id, name: product.name.clone() }));
        Ok(product)
    }

    /// Rebuilds a product from persisted fields without raising events.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: ProductId, name: String, subtitle: String, category: Category, price: Decimal,
        original_price: Option<Decimal>, discount: Option<u32>, image: String, description: String,
        badge: String, badge_color: BadgeColor, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id, name, subtitle, category, price, original_price, discount, image, description, badge,
            badge_color, created_at, updated_at, events: vec![],
        }
    }

    pub fn id(&self) -> &ProductId { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn subtitle(&self) -> &str { &self.subtitle }
    pub fn category(&self) -> &Category { &self.category }
    pub fn price(&self) -> Decimal { self.price }
    pub fn original_price(&self) -> Option<Decimal> { self.original_price }
    pub fn discount(&self) -> Option<u32> { self.discount }
    pub fn image(&self) -> &str { &self.image }
    pub fn description(&self) -> &str { &self.description }
    pub fn badge(&self) -> &str { &self.badge }
    pub fn badge_color(&self) -> &BadgeColor { &self.badge_color }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn update(&mut self, draft: ProductDraft) -> Result<(), ProductError> {
        draft.validate().map_err(ProductError::Invalid)?;
        self.apply(draft);
        self.updated_at = Utc::now();
        self.raise_event(DomainEvent::Product(ProductEvent::Updated { product_id: self.id.clone() }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }

    fn apply(&mut self, draft: ProductDraft) {
        self.discount = draft.discount();
        self.badge = draft.badge();
        self.name = draft.name.trim().to_string();
        self.subtitle = draft.subtitle.trim().to_string();
        self.category = draft.category;
        self.price = draft.price;
        self.original_price = draft.original_price;
        self.image = draft.image;
        self.description = draft.description.trim().to_string();
        self.badge_color = draft.badge_color;
    }
}

#[derive(Debug, Clone)] pub enum ProductError { Invalid(validator::ValidationErrors) }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::Invalid(e) => write!(f, "Invalid product: {e}") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, price: i64, original: Option<i64>) -> ProductDraft {
        ProductDraft {
            name: name.into(), subtitle: "Arabian heritage".into(), category: Category::Men,
            price: Decimal::new(price, 0), original_price: original.map(|o| Decimal::new(o, 0)),
            image: "https://cdn.example.com/oud.jpg".into(), description: "Natural oud with saffron".into(),
            badge: None, badge_color: BadgeColor::Red,
        }
    }

    #[test]
    fn test_discount_and_badge_derivation() {
        let d = draft("Royal Oud", 450, Some(599));
        assert_eq!(d.discount(), Some(25));
        assert_eq!(d.badge(), "25% off");

        let d = draft("Lotus", 199, None);
        assert_eq!(d.discount(), None);
        assert_eq!(d.badge(), "New");

        let d = draft("Lotus", 199, Some(150));
        assert_eq!(d.discount(), None);
    }

    #[test]
    fn test_explicit_badge_wins() {
        let mut d = draft("Royal Oud", 450, Some(599));
        d.badge = Some("Bestseller".into());
        assert_eq!(d.badge(), "Bestseller");
        d.badge = Some("  ".into());
        assert_eq!(d.badge(), "25% off");
    }

    #[test]
    fn test_create_validates_and_raises_event() {
        let mut p = Product::create(draft("Royal Oud", 450, Some(599))).unwrap();
        assert_eq!(p.discount(), Some(25));
        assert_eq!(p.price(), Decimal::new(450, 0));
        let events = p.take_events();
        assert!(matches!(events.as_slice(), [DomainEvent::Product(ProductEvent::Created { .. })]));

        assert!(Product::create(draft("  ", 450, None)).is_err());
        assert!(Product::create(draft("Oud", 0, None)).is_err());
        let mut bad_image = draft("Oud", 10, None);
        bad_image.image = "not a url".into();
        assert!(Product::create(bad_image).is_err());
    }

    #[test]
    fn test_update_recomputes_discount() {
        let mut p = Product::create(draft("Royal Oud", 450, Some(599))).unwrap();
        p.update(draft("Royal Oud", 599, Some(599))).unwrap();
        assert_eq!(p.discount(), None);
        assert_eq!(p.badge(), "New");
    }

    #[test]
    fn test_badge_color_parse() {
        assert_eq!(BadgeColor::parse("indigo"), Some(BadgeColor::Indigo));
        assert_eq!(BadgeColor::parse("bg-amber-500"), None);
    }
}
