//! SAMEH STORE
//!
//! Storefront and admin service for a small e-commerce shop.
//!
//! ## Features
//! - Product catalogue with categories, search and reviews
//! - Shopping cart, promo codes and checkout
//! - Order management with status transitions
//! - Customer accounts: addresses, wishlist, saved cards, registration
//! - Support tickets and an admin dashboard

pub mod api;
pub mod config;
pub mod domain;
pub mod registration;
pub mod seed;
pub mod shop;
pub mod store;

use thiserror::Error;

use crate::domain::aggregates::{AccountError, CartError, OrderError, ProductError, PromoError, TicketError};
use crate::domain::pricing::PricingError;
use crate::domain::value_objects::MoneyError;
use crate::store::StorageError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Promo(#[from] PromoError),

    #[error(transparent)]
    Ticket(#[from] TicketError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error("no registration is awaiting verification for {0}")]
    NoPendingRegistration(String),

    #[error("verification code does not match")]
    InvalidVerificationCode,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ShopError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self { Self::NotFound { entity, id: id.into() } }
}

impl From<PricingError> for ShopError {
    fn from(e: PricingError) -> Self {
        match e {
            PricingError::Promo(p) => Self::Promo(p),
            PricingError::Money(m) => Self::Money(m),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
