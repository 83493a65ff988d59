//! User aggregate: profile, order history summary, addresses, wishlist and saved cards.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use crate::domain::aggregates::Product;
use crate::domain::value_objects::{new_id, Money};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: String,
    name: String,
    email: String,
    phone: Option<String>,
    join_date: DateTime<Utc>,
    order_count: u32,
    total_spent: Money,
    last_order_date: Option<DateTime<Utc>>,
    is_active: bool,
    #[serde(default)]
    profile: Profile,
    #[serde(default)]
    addresses: Vec<Address>,
    #[serde(default)]
    wishlist: Vec<WishlistItem>,
    #[serde(default)]
    payment_methods: Vec<PaymentMethod>,
}

/// Registration details kept on the account.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub gender: Option<Gender>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub receive_newsletters: bool,
    pub profile_picture: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender { Male, Female, Other }

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address { pub id: String, pub name: String, pub address: String, pub city: String, pub state: String, pub postal_code: String, pub is_default: bool }

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressForm {
    #[validate(length(min = 1, message = "Address name is required"))]
    pub name: String,
    #[validate(length(min = 5, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 2, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 2, message = "State/Province is required"))]
    pub state: String,
    #[validate(length(min = 4, message = "Postal code is required"))]
    pub postal_code: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem { pub id: String, pub name: String, pub price: Money, pub added_date: DateTime<Utc> }

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Masked, e.g. `**** **** **** 1234`.
    pub card_number: String,
    pub card_holder: String,
    pub expiry_date: String,
    pub is_default: bool,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodForm {
    #[validate(custom = "validate_card_number")]
    pub card_number: String,
    #[validate(length(min = 2, message = "Cardholder name is required"))]
    pub card_holder: String,
    #[validate(custom = "validate_expiry")]
    pub expiry_date: String,
    #[validate(custom = "validate_cvv")]
    pub cvv: String,
    #[serde(default)]
    pub is_default: bool,
}

fn all_digits(s: &str) -> bool { !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) }

pub(crate) fn validate_card_number(value: &str) -> Result<(), ValidationError> {
    if value.len() == 16 && all_digits(value) { Ok(()) } else { Err(ValidationError::new("card_number_16_digits")) }
}

pub(crate) fn validate_expiry(value: &str) -> Result<(), ValidationError> {
    match value.split_once('/') {
        Some((mm, yy)) if mm.len() == 2 && yy.len() == 2 && all_digits(mm) && all_digits(yy) => Ok(()),
        _ => Err(ValidationError::new("expiry_mm_yy")),
    }
}

pub(crate) fn validate_cvv(value: &str) -> Result<(), ValidationError> {
    if (3..=4).contains(&value.len()) && all_digits(value) { Ok(()) } else { Err(ValidationError::new("cvv_3_or_4_digits")) }
}

pub fn mask_card_number(number: &str) -> String {
    let last4: String = number.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("**** **** **** {last4}")
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: Option<String>, currency: &str) -> Self {
        Self {
            id: new_id("user"), name: name.into(), email: email.into().trim().to_lowercase(), phone, join_date: Utc::now(),
            order_count: 0, total_spent: Money::zero(currency), last_order_date: None, is_active: true,
            profile: Profile::default(), addresses: vec![], wishlist: vec![], payment_methods: vec![],
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self { self.profile = profile; self }

    pub fn with_history(mut self, id: impl Into<String>, join_date: DateTime<Utc>, order_count: u32, total_spent: Money, last_order_date: Option<DateTime<Utc>>) -> Self {
        self.id = id.into(); self.join_date = join_date; self.order_count = order_count; self.total_spent = total_spent; self.last_order_date = last_order_date;
        self
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn email(&self) -> &str { &self.email }
    pub fn is_active(&self) -> bool { self.is_active }
    pub fn order_count(&self) -> u32 { self.order_count }
    pub fn total_spent(&self) -> &Money { &self.total_spent }
    pub fn last_order_date(&self) -> Option<DateTime<Utc>> { self.last_order_date }
    pub fn join_date(&self) -> DateTime<Utc> { self.join_date }
    pub fn profile(&self) -> &Profile { &self.profile }
    pub fn addresses(&self) -> &[Address] { &self.addresses }
    pub fn wishlist(&self) -> &[WishlistItem] { &self.wishlist }
    pub fn payment_methods(&self) -> &[PaymentMethod] { &self.payment_methods }
    pub fn has_email(&self, email: &str) -> bool { self.email.eq_ignore_ascii_case(email.trim()) }

    pub fn matches(&self, search: &str) -> bool {
        let q = search.trim().to_lowercase();
        q.is_empty() || self.name.to_lowercase().contains(&q) || self.email.contains(&q)
    }

    pub fn set_active(&mut self, active: bool) { self.is_active = active; }

    pub fn record_order(&mut self, total: &Money, at: DateTime<Utc>) {
        self.order_count += 1;
        self.total_spent = self.total_spent.add(total).unwrap_or_else(|_| self.total_spent.clone());
        self.last_order_date = Some(at);
    }

    pub fn add_address(&mut self, form: AddressForm) -> Result<&Address, AccountError> {
        form.validate()?;
        let make_default = form.is_default || self.addresses.is_empty();
        if make_default { self.addresses.iter_mut().for_each(|a| a.is_default = false); }
        self.addresses.push(Address {
            id: new_id("addr"), name: form.name, address: form.address, city: form.city, state: form.state,
            postal_code: form.postal_code, is_default: make_default,
        });
        self.addresses.last().ok_or(AccountError::AddressNotFound)
    }

    pub fn update_address(&mut self, address_id: &str, form: AddressForm) -> Result<&Address, AccountError> {
        form.validate()?;
        let idx = self.addresses.iter().position(|a| a.id == address_id).ok_or(AccountError::AddressNotFound)?;
        let was_default = self.addresses[idx].is_default;
        {
            let a = &mut self.addresses[idx];
            a.name = form.name; a.address = form.address; a.city = form.city; a.state = form.state; a.postal_code = form.postal_code;
        }
        if form.is_default { self.set_default_address(address_id)?; }
        else if was_default && self.addresses.len() > 1 {
            // Clearing the flag hands it to the first other address.
            self.addresses[idx].is_default = false;
            if let Some(other) = self.addresses.iter_mut().find(|a| a.id != address_id) { other.is_default = true; }
        }
        self.addresses.iter().find(|a| a.id == address_id).ok_or(AccountError::AddressNotFound)
    }

    pub fn set_default_address(&mut self, address_id: &str) -> Result<(), AccountError> {
        if !self.addresses.iter().any(|a| a.id == address_id) { return Err(AccountError::AddressNotFound); }
        self.addresses.iter_mut().for_each(|a| a.is_default = a.id == address_id);
        Ok(())
    }

    pub fn remove_address(&mut self, address_id: &str) -> Result<(), AccountError> {
        let idx = self.addresses.iter().position(|a| a.id == address_id).ok_or(AccountError::AddressNotFound)?;
        let removed = self.addresses.remove(idx);
        if removed.is_default {
            if let Some(first) = self.addresses.first_mut() { first.is_default = true; }
        }
        Ok(())
    }

    pub fn default_address(&self) -> Option<&Address> { self.addresses.iter().find(|a| a.is_default) }

    /// Adds a product to the wishlist. Returns false when it was already there.
    pub fn add_to_wishlist(&mut self, product: &Product) -> bool {
        if self.wishlist.iter().any(|w| w.id == product.id()) { return false; }
        self.wishlist.push(WishlistItem { id: product.id().to_string(), name: product.name().to_string(), price: product.price().clone(), added_date: Utc::now() });
        true
    }

    pub fn remove_from_wishlist(&mut self, product_id: &str) -> Result<(), AccountError> {
        let before = self.wishlist.len();
        self.wishlist.retain(|w| w.id != product_id);
        if self.wishlist.len() == before { return Err(AccountError::WishlistItemNotFound); }
        Ok(())
    }

    pub fn add_payment_method(&mut self, form: PaymentMethodForm) -> Result<&PaymentMethod, AccountError> {
        form.validate()?;
        let make_default = form.is_default || self.payment_methods.is_empty();
        if make_default { self.payment_methods.iter_mut().for_each(|p| p.is_default = false); }
        self.payment_methods.push(PaymentMethod {
            id: new_id("pm"), kind: "credit_card".into(), card_number: mask_card_number(&form.card_number),
            card_holder: form.card_holder, expiry_date: form.expiry_date, is_default: make_default,
        });
        self.payment_methods.last().ok_or(AccountError::PaymentMethodNotFound)
    }

    pub fn remove_payment_method(&mut self, id: &str) -> Result<(), AccountError> {
        let idx = self.payment_methods.iter().position(|p| p.id == id).ok_or(AccountError::PaymentMethodNotFound)?;
        let removed = self.payment_methods.remove(idx);
        if removed.is_default {
            if let Some(first) = self.payment_methods.first_mut() { first.is_default = true; }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("invalid form: {0}")]
    Invalid(#[from] validator::ValidationErrors),
    #[error("address not found")]
    AddressNotFound,
    #[error("wishlist item not found")]
    WishlistItemNotFound,
    #[error("payment method not found")]
    PaymentMethodNotFound,
}
