//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use crate::domain::value_objects::{new_id, Money, Percent, Quantity};
use crate::domain::events::{DomainEvent, ProductEvent};

const LOW_STOCK_THRESHOLD: u32 = 5;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: String,
    name: String,
    description: String,
    price: Money,
    image: Option<String>,
    stock: Quantity,
    discount: Percent,
    category: String,
    #[serde(default)]
    featured: bool,
    #[serde(default)]
    specifications: Vec<Specification>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)] pub struct Specification { pub key: String, pub value: String }

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category { pub id: String, pub name: String, pub image: Option<String>, #[serde(default)] pub product_count: usize }

/// Admin product form.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    pub stock: u32,
    #[serde(default)]
    #[validate(range(max = 100))]
    pub discount: u8,
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    #[serde(default)]
    pub featured: bool,
    pub image: Option<String>,
    #[serde(default)]
    pub specifications: Vec<Specification>,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() || price.is_zero() { return Err(ValidationError::new("price_must_be_positive")); }
    Ok(())
}

impl Product {
    pub fn create(draft: ProductDraft, currency: &str) -> Result<Self, ProductError> {
        draft.validate()?;
        let now = Utc::now();
        let mut product = Self {
            id: new_id("prod"), name: String::new(), description: String::new(), price: Money::zero(currency),
            image: None, stock: Quantity::default(), discount: Percent::default(), category: String::new(),
            featured: false, specifications: vec![], created_at: now, updated_at: now, events: vec![],
        };
        product.apply(draft, currency)?;
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: product.id.clone() }));
        Ok(product)
    }

    /// Sample catalogue entries keep their well-known ids.
    pub fn with_id(mut self, id: impl Into<String>) -> Self { self.id = id.into(); self.events.clear(); self }

    pub fn update(&mut self, draft: ProductDraft) -> Result<(), ProductError> {
        draft.validate()?;
        let currency = self.price.currency().to_string();
        // An edit without a new image keeps the current one.
        let image = draft.image.clone().or_else(|| self.image.clone());
        self.apply(draft, &currency)?;
        self.image = image;
        Ok(())
    }

    fn apply(&mut self, draft: ProductDraft, currency: &str) -> Result<(), ProductError> {
        self.name = draft.name.trim().to_string();
        self.description = draft.description;
        self.price = Money::new(draft.price, currency);
        self.stock = Quantity::new(draft.stock);
        self.discount = Percent::new(draft.discount).map_err(|_| ProductError::InvalidDiscount)?;
        self.category = draft.category;
        self.featured = draft.featured;
        self.image = draft.image;
        self.specifications = draft.specifications.into_iter().filter(|s| !s.key.trim().is_empty() && !s.value.trim().is_empty()).collect();
        self.touch();
        Ok(())
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> &str { &self.description }
    pub fn price(&self) -> &Money { &self.price }
    pub fn image(&self) -> Option<&str> { self.image.as_deref() }
    pub fn stock(&self) -> Quantity { self.stock }
    pub fn discount(&self) -> Percent { self.discount }
    pub fn category(&self) -> &str { &self.category }
    pub fn is_featured(&self) -> bool { self.featured }
    pub fn specifications(&self) -> &[Specification] { &self.specifications }

    /// Case-insensitive search over name and description plus an exact category filter.
    pub fn matches(&self, search: Option<&str>, category: Option<&str>) -> bool {
        let matches_search = search.map(str::trim).filter(|q| !q.is_empty()).map_or(true, |q| {
            let q = q.to_lowercase();
            self.name.to_lowercase().contains(&q) || self.description.to_lowercase().contains(&q)
        });
        let matches_category = category.map_or(true, |c| c == "all" || self.category.eq_ignore_ascii_case(c));
        matches_search && matches_category
    }

    pub fn remove_inventory(&mut self, qty: u32) -> Result<(), ProductError> {
        self.stock = self.stock.subtract(qty).ok_or(ProductError::InsufficientInventory { available: self.stock.value(), requested: qty })?;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::InventoryRemoved { product_id: self.id.clone(), quantity: qty }));
        if self.stock.value() <= LOW_STOCK_THRESHOLD {
            self.raise_event(DomainEvent::Product(ProductEvent::LowStock { product_id: self.id.clone(), remaining: self.stock.value() }));
        }
        Ok(())
    }

    pub fn restore_inventory(&mut self, qty: u32) {
        self.stock = self.stock.add(qty);
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::InventoryRestored { product_id: self.id.clone(), quantity: qty }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("invalid product: {0}")]
    Invalid(#[from] validator::ValidationErrors),
    #[error("discount must be between 0 and 100")]
    InvalidDiscount,
    #[error("insufficient inventory: {available} available, {requested} requested")]
    InsufficientInventory { available: u32, requested: u32 },
}

#[cfg(test)]
pub(crate) fn draft(name: &str, price: Decimal, stock: u32, discount: u8) -> ProductDraft {
    ProductDraft {
        name: name.into(), description: format!("{name} description"), price, stock, discount,
        category: "electronics".into(), featured: false, image: None, specifications: vec![],
    }
}
