//! HTTP surface: routes, request/response DTOs and error mapping.

mod admin;
mod error;
mod extract;
mod storefront;

use std::sync::Arc;

use axum::{http::StatusCode, routing::{delete, get, post, put}, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::shop::Shop;

pub use error::{ApiError, ApiResult, ErrorBody};
pub use extract::{AppJson, AppPath, AppQuery};

#[derive(Clone)]
pub struct AppState { pub shop: Arc<Mutex<Shop>> }

impl AppState {
    pub fn new(shop: Shop) -> Self { Self { shop: Arc::new(Mutex::new(shop)) } }

    /// Runs a mutating shop operation on the blocking pool. Saves may hit the disk.
    pub async fn write<T, F>(&self, f: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Shop) -> crate::Result<T> + Send + 'static,
    {
        let shop = Arc::clone(&self.shop);
        let outcome = tokio::task::spawn_blocking(move || f(&mut shop.blocking_lock())).await.map_err(|e| {
            tracing::error!(error = %e, "shop write task failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "shop write task failed")
        })?;
        Ok(outcome?)
    }
}

#[derive(Debug, Default, Deserialize)] pub struct ListParams { pub page: Option<u32>, pub per_page: Option<u32> }
#[derive(Debug, Serialize)] pub struct PaginatedResponse<T> { pub data: Vec<T>, pub total: usize, pub page: u32 }

impl ListParams {
    pub fn paginate<T>(&self, items: Vec<T>) -> PaginatedResponse<T> {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let total = items.len();
        let skip = (page as usize - 1).saturating_mul(per_page as usize);
        PaginatedResponse { data: items.into_iter().skip(skip).take(per_page as usize).collect(), total, page }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "sameh-store"})) }))
        // catalogue
        .route("/api/v1/products", get(storefront::list_products).post(admin::create_product))
        .route("/api/v1/products/featured", get(storefront::featured_products))
        .route("/api/v1/products/:id", get(storefront::get_product).put(admin::update_product).delete(admin::delete_product))
        .route("/api/v1/products/:id/recommended", get(storefront::recommended_products))
        .route("/api/v1/products/:id/comments", get(storefront::list_comments).post(storefront::add_comment))
        .route("/api/v1/products/:id/rating", get(storefront::product_rating))
        .route("/api/v1/categories", get(storefront::list_categories))
        // cart and checkout
        .route("/api/v1/cart/:session", get(storefront::get_cart).delete(storefront::clear_cart))
        .route("/api/v1/cart/:session/items", post(storefront::add_to_cart))
        .route("/api/v1/cart/:session/items/:product_id", put(storefront::update_cart_item).delete(storefront::remove_cart_item))
        .route("/api/v1/cart/:session/items/:product_id/decrement", post(storefront::decrement_cart_item))
        .route("/api/v1/cart/:session/quote", post(storefront::quote_cart))
        .route("/api/v1/checkout", post(storefront::checkout))
        // accounts
        .route("/api/v1/register", post(storefront::register))
        .route("/api/v1/register/verify", post(storefront::verify_registration))
        .route("/api/v1/register/resend", post(storefront::resend_code))
        .route("/api/v1/users", get(admin::list_users))
        .route("/api/v1/users/:id", get(admin::get_user))
        .route("/api/v1/users/:id/toggle-active", post(admin::toggle_user_active))
        .route("/api/v1/users/:id/orders", get(storefront::user_orders))
        .route("/api/v1/users/:id/addresses", post(storefront::add_address))
        .route("/api/v1/users/:id/addresses/:address_id", put(storefront::update_address).delete(storefront::remove_address))
        .route("/api/v1/users/:id/addresses/:address_id/default", post(storefront::set_default_address))
        .route("/api/v1/users/:id/wishlist", post(storefront::add_to_wishlist))
        .route("/api/v1/users/:id/wishlist/:product_id", delete(storefront::remove_from_wishlist))
        .route("/api/v1/users/:id/payment-methods", post(storefront::add_payment_method))
        .route("/api/v1/users/:id/payment-methods/:method_id", delete(storefront::remove_payment_method))
        // orders
        .route("/api/v1/orders", get(admin::list_orders))
        .route("/api/v1/orders/:id", get(admin::get_order))
        .route("/api/v1/orders/:id/status", put(admin::update_order_status))
        // promo codes
        .route("/api/v1/promo-codes", get(admin::list_promo_codes).post(admin::create_promo_code))
        .route("/api/v1/promo-codes/validate", post(storefront::validate_promo_code))
        .route("/api/v1/promo-codes/:id", get(admin::get_promo_code).put(admin::update_promo_code).delete(admin::delete_promo_code))
        .route("/api/v1/promo-codes/:id/toggle", post(admin::toggle_promo_code))
        // support
        .route("/api/v1/tickets", get(admin::list_tickets).post(storefront::open_ticket))
        .route("/api/v1/tickets/:id", get(admin::get_ticket))
        .route("/api/v1/tickets/:id/messages", post(admin::post_ticket_message))
        .route("/api/v1/tickets/:id/status", put(admin::set_ticket_status))
        .route("/api/v1/tickets/:id/close", post(admin::close_ticket))
        // dashboard
        .route("/api/v1/admin/stats", get(admin::dashboard_stats))
        .route("/api/v1/admin/sales", get(admin::sales_series))
        .route("/api/v1/admin/top-products", get(admin::top_products))
        .route("/api/v1/admin/dashboard/customer-behavior", get(admin::customer_behavior))
        // preferences
        .route("/api/v1/preferences/accent-color", get(storefront::get_accent_color).put(storefront::set_accent_color))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_defaults_and_bounds() {
        let items: Vec<u32> = (1..=45).collect();
        let first = ListParams::default().paginate(items.clone());
        assert_eq!((first.data.len(), first.total, first.page), (20, 45, 1));
        let last = ListParams { page: Some(3), per_page: None }.paginate(items.clone());
        assert_eq!(last.data, vec![41, 42, 43, 44, 45]);
        let zero = ListParams { page: Some(0), per_page: Some(500) }.paginate(items);
        assert_eq!((zero.data.len(), zero.page), (45, 1));
    }
}
