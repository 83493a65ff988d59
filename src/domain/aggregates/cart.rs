//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Money, Percent};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    session_id: String,
    items: Vec<CartItem>,
    subtotal: Money,
    total_items: u32,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: Money,
    pub discount: Percent,
    pub quantity: u32,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id().to_string(), name: product.name().to_string(), image: product.image().map(str::to_string),
            unit_price: product.price().clone(), discount: product.discount(), quantity,
        }
    }
    pub fn effective_unit_price(&self) -> Money { self.discount.apply_to(&self.unit_price) }
    pub fn line_total(&self) -> Money { self.effective_unit_price().multiply(self.quantity) }
}

impl Cart {
    pub fn new(session_id: impl Into<String>, currency: &str) -> Self {
        Self {
            session_id: session_id.into(), items: vec![], subtotal: Money::zero(currency), total_items: 0,
            currency: currency.to_string(), created_at: Utc::now(), updated_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> &str { &self.session_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn total_items(&self) -> u32 { self.total_items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn quantity_of(&self, product_id: &str) -> u32 { self.items.iter().find(|i| i.product_id == product_id).map_or(0, |i| i.quantity) }

    /// Adds `quantity` units, merging into an existing line for the same product.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity); }
        if product.price().currency() != self.currency { return Err(CartError::CurrencyMismatch); }
        let wanted = self.quantity_of(product.id()).saturating_add(quantity);
        if wanted > product.stock().value() {
            return Err(CartError::InsufficientStock { product_id: product.id().to_string(), available: product.stock().value() });
        }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product.id()) {
            existing.quantity = wanted;
        } else {
            self.items.push(CartItem::from_product(product, quantity));
        }
        self.recalculate();
        Ok(())
    }

    /// Sets a line's quantity; zero removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 { self.items.retain(|i| i.product_id != product_id); }
        else { item.quantity = quantity; }
        self.recalculate();
        Ok(())
    }

    /// Removes one unit; the last unit takes the line with it.
    pub fn decrement(&mut self, product_id: &str) -> Result<(), CartError> {
        let current = self.quantity_of(product_id);
        if current == 0 { return Err(CartError::ItemNotFound); }
        self.update_quantity(product_id, current - 1)
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.recalculate();
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); self.recalculate(); }

    fn recalculate(&mut self) {
        self.subtotal = self.items.iter().fold(Money::zero(&self.currency), |acc, i| acc.add(&i.line_total()).unwrap_or(acc));
        self.total_items = self.items.iter().map(|i| i.quantity).sum();
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CartError {
    #[error("Item not found")]
    ItemNotFound,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Only {available} units of {product_id} in stock")]
    InsufficientStock { product_id: String, available: u32 },
    #[error("Currency mismatch")]
    CurrencyMismatch,
}
