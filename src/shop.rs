//! Use-case operations over the store, one per storefront or admin action.
//!
//! Every operation loads the collections it touches, applies the change on the
//! aggregates and writes them back. Domain events raised along the way are
//! drained and emitted as structured log records.

use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use validator::Validate;

use crate::config::AppConfig;
use crate::domain::aggregates::{
    average_rating, AddressForm, Cart, CartError, Category, CommentForm, Customer, LineItem, Order, OrderStatus, PaymentMethodForm, Product,
    ProductComment, ProductDraft, PromoCode, PromoDraft, PromoError, PromoRedemption, Sender, ShippingAddress, SupportTicket,
    TicketStatus, User,
};
use crate::domain::analytics::{self, Behavior, BehaviorPoint, DashboardStats, Period, SalesPoint, TopProduct};
use crate::domain::events::DomainEvent;
use crate::domain::pricing::{self, AppliedPromo, PriceQuote, ShippingPolicy};
use crate::domain::value_objects::Money;
use crate::store::{keys, Storage};
use crate::{Result, ShopError};

const RECOMMENDED_COUNT: usize = 4;
const TOP_PRODUCTS_COUNT: usize = 5;

/// A collection persisted as one list under a storage key.
pub(crate) trait Record: Serialize + DeserializeOwned + Clone {
    const KEY: &'static str;
    const ENTITY: &'static str;
    fn record_id(&self) -> &str;
    fn drain_events(&mut self) -> Vec<DomainEvent> { vec![] }
}

impl Record for Product {
    const KEY: &'static str = keys::PRODUCTS;
    const ENTITY: &'static str = "product";
    fn record_id(&self) -> &str { self.id() }
    fn drain_events(&mut self) -> Vec<DomainEvent> { self.take_events() }
}

impl Record for Order {
    const KEY: &'static str = keys::ORDERS;
    const ENTITY: &'static str = "order";
    fn record_id(&self) -> &str { self.id() }
    fn drain_events(&mut self) -> Vec<DomainEvent> { self.take_events() }
}

impl Record for PromoCode {
    const KEY: &'static str = keys::PROMO_CODES;
    const ENTITY: &'static str = "promo code";
    fn record_id(&self) -> &str { self.id() }
    fn drain_events(&mut self) -> Vec<DomainEvent> { self.take_events() }
}

impl Record for SupportTicket {
    const KEY: &'static str = keys::SUPPORT_TICKETS;
    const ENTITY: &'static str = "ticket";
    fn record_id(&self) -> &str { self.id() }
    fn drain_events(&mut self) -> Vec<DomainEvent> { self.take_events() }
}

impl Record for User {
    const KEY: &'static str = keys::USERS;
    const ENTITY: &'static str = "user";
    fn record_id(&self) -> &str { self.id() }
}

impl Record for Cart {
    const KEY: &'static str = keys::CARTS;
    const ENTITY: &'static str = "cart";
    fn record_id(&self) -> &str { self.session_id() }
}

impl Record for ProductComment {
    const KEY: &'static str = keys::PRODUCT_COMMENTS;
    const ENTITY: &'static str = "comment";
    fn record_id(&self) -> &str { &self.id }
}

impl Record for Category {
    const KEY: &'static str = keys::CATEGORIES;
    const ENTITY: &'static str = "category";
    fn record_id(&self) -> &str { &self.id }
}

// =============================================================================
// Query filters
// =============================================================================

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductFilter { pub search: Option<String>, pub category: Option<String>, pub featured: Option<bool> }

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderFilter { pub search: Option<String>, pub status: Option<OrderStatus> }

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserFilter { pub search: Option<String>, pub active: Option<bool> }

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TicketFilter { pub search: Option<String>, pub status: Option<TicketStatus> }

/// Checkout form: who pays, where it ships, how it is paid.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate]
    pub customer: Customer,
    #[validate]
    pub shipping_address: ShippingAddress,
    #[validate(length(min = 1, message = "payment method is required"))]
    pub payment_method: String,
    pub promo_code: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccentColor { #[default] Blue, Green, Purple, Red, Orange, Pink }

pub struct Shop {
    pub(crate) storage: Storage,
    pub(crate) currency: String,
    shipping: ShippingPolicy,
}

impl Shop {
    pub fn new(storage: Storage, config: &AppConfig) -> Self {
        Self { storage, currency: config.currency.clone(), shipping: config.shipping.clone() }
    }

    pub fn currency(&self) -> &str { &self.currency }

    // ----- collection plumbing -----

    pub(crate) fn all<T: Record>(&self) -> Vec<T> { self.storage.load_list(T::KEY) }

    pub(crate) fn save_all<T: Record>(&mut self, items: &mut [T]) -> Result<()> {
        self.storage.save_list(T::KEY, items)?;
        let events: Vec<DomainEvent> = items.iter_mut().flat_map(Record::drain_events).collect();
        publish(&events);
        Ok(())
    }

    fn find<T: Record>(&self, id: &str) -> Result<T> {
        self.all::<T>().into_iter().find(|r| r.record_id() == id).ok_or_else(|| ShopError::not_found(T::ENTITY, id))
    }

    /// Loads a record, applies `f` and writes the collection back when `f` succeeds.
    fn modify<T: Record>(&mut self, id: &str, f: impl FnOnce(&mut T) -> Result<()>) -> Result<T> {
        let mut items = self.all::<T>();
        let idx = items.iter().position(|r| r.record_id() == id).ok_or_else(|| ShopError::not_found(T::ENTITY, id))?;
        f(&mut items[idx])?;
        self.save_all(&mut items)?;
        Ok(items.swap_remove(idx))
    }

    fn insert<T: Record>(&mut self, mut record: T) -> Result<T> {
        let mut items = self.all::<T>();
        let events = record.drain_events();
        items.push(record.clone());
        self.save_all(&mut items)?;
        publish(&events);
        Ok(record)
    }

    fn delete<T: Record>(&mut self, id: &str) -> Result<()> {
        let mut items = self.all::<T>();
        let before = items.len();
        items.retain(|r| r.record_id() != id);
        if items.len() == before { return Err(ShopError::not_found(T::ENTITY, id)); }
        self.save_all(&mut items)
    }

    // =========================================================================
    // Products and categories
    // =========================================================================

    pub fn list_products(&self, filter: &ProductFilter) -> Vec<Product> {
        self.all::<Product>()
            .into_iter()
            .filter(|p| p.matches(filter.search.as_deref(), filter.category.as_deref()))
            .filter(|p| filter.featured.map_or(true, |f| p.is_featured() == f))
            .collect()
    }

    pub fn get_product(&self, id: &str) -> Result<Product> { self.find(id) }

    pub fn featured_products(&self) -> Vec<Product> { self.all::<Product>().into_iter().filter(Product::is_featured).collect() }

    /// The first few catalogue entries, leaving out the product being viewed.
    pub fn recommended_products(&self, exclude: Option<&str>) -> Vec<Product> {
        self.all::<Product>().into_iter().filter(|p| Some(p.id()) != exclude).take(RECOMMENDED_COUNT).collect()
    }

    pub fn create_product(&mut self, draft: ProductDraft) -> Result<Product> {
        let product = Product::create(draft, &self.currency)?;
        tracing::info!(product_id = product.id(), name = product.name(), "product created");
        self.insert(product)
    }

    pub fn update_product(&mut self, id: &str, draft: ProductDraft) -> Result<Product> {
        self.modify(id, |p: &mut Product| Ok(p.update(draft)?))
    }

    pub fn delete_product(&mut self, id: &str) -> Result<()> {
        self.delete::<Product>(id)?;
        tracing::info!(product_id = id, "product deleted");
        Ok(())
    }

    /// Stored categories plus any category only referenced by products, with live counts.
    pub fn categories(&self) -> Vec<Category> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for product in self.all::<Product>() { *counts.entry(product.category().to_lowercase()).or_default() += 1; }
        let mut categories = self.all::<Category>();
        for c in categories.iter_mut() { c.product_count = counts.remove(&c.id.to_lowercase()).unwrap_or(0); }
        let mut extra: Vec<Category> = counts
            .into_iter()
            .map(|(id, product_count)| Category { name: title_case(&id), id, image: None, product_count })
            .collect();
        extra.sort_by(|a, b| a.id.cmp(&b.id));
        categories.extend(extra);
        categories
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Comments for a product, newest first.
    pub fn product_comments(&self, product_id: &str) -> Result<Vec<ProductComment>> {
        self.get_product(product_id)?;
        let mut comments: Vec<ProductComment> = self.all::<ProductComment>().into_iter().filter(|c| c.product_id == product_id).collect();
        comments.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(comments)
    }

    pub fn add_comment(&mut self, product_id: &str, form: CommentForm) -> Result<ProductComment> {
        self.get_product(product_id)?;
        let user: User = self.find(&form.user_id)?;
        let comment = ProductComment::new(product_id, user.name(), user.profile().profile_picture.clone(), form)?;
        tracing::info!(product_id, comment_id = %comment.id, rating = comment.rating, "comment added");
        self.insert(comment)
    }

    pub fn product_rating(&self, product_id: &str) -> Result<Option<Decimal>> {
        Ok(average_rating(&self.product_comments(product_id)?))
    }

    // =========================================================================
    // Carts
    // =========================================================================

    /// The session's cart; an unknown session gets a fresh empty one.
    pub fn cart(&self, session_id: &str) -> Cart {
        self.find(session_id).unwrap_or_else(|_| Cart::new(session_id, &self.currency))
    }

    fn modify_cart(&mut self, session_id: &str, f: impl FnOnce(&mut Cart, &[Product]) -> Result<()>) -> Result<Cart> {
        let products = self.all::<Product>();
        let mut carts = self.all::<Cart>();
        let idx = match carts.iter().position(|c| c.session_id() == session_id) {
            Some(idx) => idx,
            None => { carts.push(Cart::new(session_id, &self.currency)); carts.len() - 1 }
        };
        f(&mut carts[idx], &products)?;
        let cart = carts[idx].clone();
        carts.retain(|c| !c.is_empty());
        self.save_all(&mut carts)?;
        Ok(cart)
    }

    pub fn add_to_cart(&mut self, session_id: &str, product_id: &str, quantity: u32) -> Result<Cart> {
        self.modify_cart(session_id, |cart, products| {
            let product = products.iter().find(|p| p.id() == product_id).ok_or_else(|| ShopError::not_found("product", product_id))?;
            Ok(cart.add_item(product, quantity)?)
        })
    }

    pub fn update_cart_item(&mut self, session_id: &str, product_id: &str, quantity: u32) -> Result<Cart> {
        self.modify_cart(session_id, |cart, products| {
            if let Some(product) = products.iter().find(|p| p.id() == product_id) {
                if quantity > product.stock().value() {
                    return Err(CartError::InsufficientStock { product_id: product_id.to_string(), available: product.stock().value() }.into());
                }
            }
            Ok(cart.update_quantity(product_id, quantity)?)
        })
    }

    pub fn decrement_cart_item(&mut self, session_id: &str, product_id: &str) -> Result<Cart> {
        self.modify_cart(session_id, |cart, _| Ok(cart.decrement(product_id)?))
    }

    pub fn remove_cart_item(&mut self, session_id: &str, product_id: &str) -> Result<Cart> {
        self.modify_cart(session_id, |cart, _| Ok(cart.remove_item(product_id)?))
    }

    pub fn clear_cart(&mut self, session_id: &str) -> Result<Cart> {
        self.modify_cart(session_id, |cart, _| { cart.clear(); Ok(()) })
    }

    /// Prices the session's cart, optionally with a promo code for a given customer.
    pub fn quote_cart(&self, session_id: &str, promo_code: Option<&str>, customer_email: Option<&str>) -> Result<PriceQuote> {
        let cart = self.cart(session_id);
        self.price(cart.subtotal(), promo_code, customer_email)
    }

    /// Previews a promo code against an arbitrary subtotal.
    pub fn validate_promo_code(&self, code: &str, subtotal: Decimal, customer_email: Option<&str>) -> Result<PriceQuote> {
        self.price(&Money::new(subtotal, &self.currency), Some(code), customer_email)
    }

    fn price(&self, subtotal: &Money, promo_code: Option<&str>, customer_email: Option<&str>) -> Result<PriceQuote> {
        let promo = promo_code.filter(|c| !c.trim().is_empty()).map(|c| self.find_promo_by_code(c)).transpose()?;
        let customer_uses = match (&promo, customer_email) {
            (Some(p), Some(email)) => self.redemptions_by(p.id(), email),
            _ => 0,
        };
        let applied = promo.as_ref().map(|promo| AppliedPromo { promo, customer_uses });
        Ok(pricing::quote(subtotal, &self.shipping, applied, Utc::now())?)
    }

    fn find_promo_by_code(&self, code: &str) -> Result<PromoCode> {
        self.all::<PromoCode>().into_iter().find(|p| p.matches_code(code)).ok_or(ShopError::Promo(PromoError::NotFound))
    }

    fn redemptions_by(&self, promo_id: &str, email: &str) -> u32 {
        let redemptions: Vec<PromoRedemption> = self.storage.load_list(keys::PROMO_REDEMPTIONS);
        let count = redemptions.iter().filter(|r| r.promo_id == promo_id && r.customer_email.eq_ignore_ascii_case(email.trim())).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Turns the session's cart into a paid order and empties the cart.
    pub fn checkout(&mut self, session_id: &str, request: CheckoutRequest) -> Result<Order> {
        request.validate()?;
        let cart = self.cart(session_id);
        if cart.is_empty() { return Err(ShopError::EmptyCart); }

        // Priced from the live catalogue, not the cart snapshot.
        let mut products = self.all::<Product>();
        let mut priced = Cart::new(session_id, &self.currency);
        for item in cart.items() {
            let product = products.iter().find(|p| p.id() == item.product_id).ok_or_else(|| ShopError::not_found("product", &item.product_id))?;
            priced.add_item(product, item.quantity)?;
        }

        let email = request.customer.email.trim().to_lowercase();
        let quote = self.price(priced.subtotal(), request.promo_code.as_deref(), Some(&email))?;

        let mut orders = self.all::<Order>();
        let mut order = Order::create(next_order_number(&orders), request.customer, request.shipping_address, request.payment_method, quote.totals());
        for item in priced.items() {
            order.add_item(LineItem { id: item.product_id.clone(), name: item.name.clone(), price: item.effective_unit_price(), quantity: item.quantity });
        }
        for item in priced.items() {
            if let Some(product) = products.iter_mut().find(|p| p.id() == item.product_id) { product.remove_inventory(item.quantity)?; }
        }
        order.mark_stock_reserved();

        let mut promos = self.all::<PromoCode>();
        let mut redemption = None;
        if let Some(code) = &quote.promo_code {
            order.set_promo_code(code.clone());
            if let Some(promo) = promos.iter_mut().find(|p| p.code() == code) {
                promo.redeem();
                redemption = Some(PromoRedemption { promo_id: promo.id().to_string(), customer_email: email.clone(), order_id: order.id().to_string(), redeemed_at: Utc::now() });
            }
        }

        order.confirm()?;
        order.mark_paid()?;

        let mut users = self.all::<User>();
        if let Some(user) = users.iter_mut().find(|u| u.has_email(&email)) { user.record_order(order.total(), order.date()); }

        tracing::info!(order_id = order.id(), total = %order.total(), items = order.items().len(), "checkout completed");
        orders.push(order.clone());
        self.save_all(&mut orders)?;
        self.save_all(&mut products)?;
        self.save_all(&mut promos)?;
        if let Some(redemption) = redemption {
            let mut redemptions: Vec<PromoRedemption> = self.storage.load_list(keys::PROMO_REDEMPTIONS);
            redemptions.push(redemption);
            self.storage.save_list(keys::PROMO_REDEMPTIONS, &redemptions)?;
        }
        self.save_all(&mut users)?;
        self.clear_cart(session_id)?;
        Ok(order)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Orders matching the filter, newest first.
    pub fn list_orders(&self, filter: &OrderFilter) -> Vec<Order> {
        let mut orders: Vec<Order> = self.all::<Order>()
            .into_iter()
            .filter(|o| filter.search.as_deref().map_or(true, |q| o.matches(q)))
            .filter(|o| filter.status.map_or(true, |s| o.status() == s))
            .collect();
        orders.sort_by(|a, b| b.date().cmp(&a.date()));
        orders
    }

    pub fn get_order(&self, id: &str) -> Result<Order> { self.find(id) }

    pub fn customer_orders(&self, email: &str) -> Vec<Order> {
        self.list_orders(&OrderFilter::default()).into_iter().filter(|o| o.customer().email.eq_ignore_ascii_case(email.trim())).collect()
    }

    /// Moves an order along its lifecycle. Cancelling an order placed through
    /// checkout puts its items back on the shelf.
    pub fn update_order_status(&mut self, id: &str, status: OrderStatus) -> Result<Order> {
        let previous = self.get_order(id)?.status();
        let order = self.modify(id, |o: &mut Order| {
            match status {
                OrderStatus::Cancelled => o.cancel()?,
                OrderStatus::Shipped => o.ship()?,
                OrderStatus::Delivered => o.deliver()?,
                other => o.transition_to(other)?,
            }
            Ok(())
        })?;
        if status == OrderStatus::Cancelled && previous != OrderStatus::Cancelled && order.stock_reserved() {
            let mut products = self.all::<Product>();
            for item in order.items() {
                match products.iter_mut().find(|p| p.id() == item.id) {
                    Some(product) => product.restore_inventory(item.quantity),
                    None => tracing::warn!(order_id = id, product_id = %item.id, "cannot restock removed product"),
                }
            }
            self.save_all(&mut products)?;
        }
        Ok(order)
    }

    // =========================================================================
    // Users and accounts
    // =========================================================================

    pub fn list_users(&self, filter: &UserFilter) -> Vec<User> {
        self.all::<User>()
            .into_iter()
            .filter(|u| filter.search.as_deref().map_or(true, |q| u.matches(q)))
            .filter(|u| filter.active.map_or(true, |a| u.is_active() == a))
            .collect()
    }

    pub fn get_user(&self, id: &str) -> Result<User> { self.find(id) }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> { self.all::<User>().into_iter().find(|u| u.has_email(email)) }

    pub(crate) fn add_user(&mut self, user: User) -> Result<User> {
        if self.find_user_by_email(user.email()).is_some() {
            return Err(ShopError::Conflict(format!("an account with email {} already exists", user.email())));
        }
        tracing::info!(user_id = user.id(), "user created");
        self.insert(user)
    }

    pub fn toggle_user_active(&mut self, id: &str) -> Result<User> {
        self.modify(id, |u: &mut User| { u.set_active(!u.is_active()); Ok(()) })
    }

    pub fn add_address(&mut self, user_id: &str, form: AddressForm) -> Result<User> {
        self.modify(user_id, |u: &mut User| { u.add_address(form)?; Ok(()) })
    }

    pub fn update_address(&mut self, user_id: &str, address_id: &str, form: AddressForm) -> Result<User> {
        self.modify(user_id, |u: &mut User| { u.update_address(address_id, form)?; Ok(()) })
    }

    pub fn set_default_address(&mut self, user_id: &str, address_id: &str) -> Result<User> {
        self.modify(user_id, |u: &mut User| Ok(u.set_default_address(address_id)?))
    }

    pub fn remove_address(&mut self, user_id: &str, address_id: &str) -> Result<User> {
        self.modify(user_id, |u: &mut User| Ok(u.remove_address(address_id)?))
    }

    pub fn add_to_wishlist(&mut self, user_id: &str, product_id: &str) -> Result<User> {
        let product = self.get_product(product_id)?;
        self.modify(user_id, |u: &mut User| {
            if !u.add_to_wishlist(&product) { tracing::debug!(user_id, product_id, "already on wishlist"); }
            Ok(())
        })
    }

    pub fn remove_from_wishlist(&mut self, user_id: &str, product_id: &str) -> Result<User> {
        self.modify(user_id, |u: &mut User| Ok(u.remove_from_wishlist(product_id)?))
    }

    pub fn add_payment_method(&mut self, user_id: &str, form: PaymentMethodForm) -> Result<User> {
        self.modify(user_id, |u: &mut User| { u.add_payment_method(form)?; Ok(()) })
    }

    pub fn remove_payment_method(&mut self, user_id: &str, payment_method_id: &str) -> Result<User> {
        self.modify(user_id, |u: &mut User| Ok(u.remove_payment_method(payment_method_id)?))
    }

    // =========================================================================
    // Promo codes
    // =========================================================================

    pub fn list_promo_codes(&self, search: Option<&str>) -> Vec<PromoCode> {
        let q = search.map(|s| s.trim().to_uppercase()).unwrap_or_default();
        self.all::<PromoCode>().into_iter().filter(|p| p.code().contains(&q)).collect()
    }

    pub fn get_promo_code(&self, id: &str) -> Result<PromoCode> { self.find(id) }

    pub fn create_promo_code(&mut self, draft: PromoDraft) -> Result<PromoCode> {
        let promo = PromoCode::create(draft)?;
        self.ensure_unique_code(promo.code(), None)?;
        tracing::info!(promo_id = promo.id(), code = promo.code(), "promo code created");
        self.insert(promo)
    }

    pub fn update_promo_code(&mut self, id: &str, draft: PromoDraft) -> Result<PromoCode> {
        self.ensure_unique_code(&draft.code, Some(id))?;
        self.modify(id, |p: &mut PromoCode| Ok(p.update(draft)?))
    }

    pub fn delete_promo_code(&mut self, id: &str) -> Result<()> { self.delete::<PromoCode>(id) }

    pub fn toggle_promo_code(&mut self, id: &str) -> Result<PromoCode> {
        self.modify(id, |p: &mut PromoCode| { p.set_active(!p.is_active()); Ok(()) })
    }

    fn ensure_unique_code(&self, code: &str, except_id: Option<&str>) -> Result<()> {
        let taken = self.all::<PromoCode>().iter().any(|p| p.matches_code(code) && Some(p.id()) != except_id);
        if taken { return Err(ShopError::Conflict(format!("promo code {} already exists", code.trim().to_uppercase()))); }
        Ok(())
    }

    // =========================================================================
    // Support tickets
    // =========================================================================

    pub fn open_ticket(&mut self, subject: &str, customer: Customer, message: &str) -> Result<SupportTicket> {
        customer.validate()?;
        let ticket = SupportTicket::open(subject, customer, message)?;
        self.insert(ticket)
    }

    /// Tickets matching the filter, most recently updated first.
    pub fn list_tickets(&self, filter: &TicketFilter) -> Vec<SupportTicket> {
        let mut tickets: Vec<SupportTicket> = self.all::<SupportTicket>()
            .into_iter()
            .filter(|t| filter.search.as_deref().map_or(true, |q| t.matches(q)))
            .filter(|t| filter.status.map_or(true, |s| t.status() == s))
            .collect();
        tickets.sort_by(|a, b| b.last_updated().cmp(&a.last_updated()));
        tickets
    }

    pub fn get_ticket(&self, id: &str) -> Result<SupportTicket> { self.find(id) }

    pub fn post_ticket_message(&mut self, id: &str, sender: Sender, text: &str) -> Result<SupportTicket> {
        self.modify(id, |t: &mut SupportTicket| { t.post_message(sender, text)?; Ok(()) })
    }

    pub fn set_ticket_status(&mut self, id: &str, status: TicketStatus) -> Result<SupportTicket> {
        self.modify(id, |t: &mut SupportTicket| Ok(t.set_status(status)?))
    }

    pub fn close_ticket(&mut self, id: &str) -> Result<SupportTicket> {
        self.modify(id, |t: &mut SupportTicket| Ok(t.close()?))
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    pub fn dashboard_stats(&self) -> DashboardStats {
        analytics::dashboard_stats(&self.all::<Order>(), &self.all::<User>(), &self.all::<SupportTicket>(), &self.currency)
    }

    pub fn sales_series(&self, period: Period) -> Vec<SalesPoint> { analytics::sales_series(&self.all::<Order>(), period, Utc::now()) }

    pub fn top_products(&self) -> Vec<TopProduct> { analytics::top_products(&self.all::<Order>(), TOP_PRODUCTS_COUNT) }

    pub fn customer_behavior(&self, kind: Behavior) -> Vec<BehaviorPoint> {
        analytics::customer_behavior(kind, &self.all::<Cart>(), &self.all::<Order>(), Utc::now())
    }

    // =========================================================================
    // Preferences
    // =========================================================================

    pub fn accent_color(&self) -> AccentColor { self.storage.load_value(keys::ACCENT_COLOR).unwrap_or_default() }

    pub fn set_accent_color(&mut self, color: AccentColor) -> Result<AccentColor> {
        self.storage.save_value(keys::ACCENT_COLOR, &color)?;
        Ok(color)
    }
}

fn publish(events: &[DomainEvent]) {
    for event in events {
        match serde_json::to_string(event) {
            Ok(payload) => tracing::info!(target: "sameh_store::events", event = %payload, "domain event"),
            Err(e) => tracing::warn!(error = %e, ?event, "unserializable domain event"),
        }
    }
}

/// Random six-digit order number not yet taken.
fn next_order_number(existing: &[Order]) -> u32 {
    let mut rng = rand::thread_rng();
    loop {
        let n: u32 = rng.gen_range(100_000..1_000_000);
        let id = format!("ORD-{n:06}");
        if !existing.iter().any(|o| o.id() == id) { return n; }
    }
}

fn title_case(id: &str) -> String {
    let mut chars = id.chars();
    chars.next().map(|c| c.to_uppercase().chain(chars).collect()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::draft;
    use crate::domain::aggregates::promo::promo_draft;
    use crate::domain::aggregates::{PaymentStatus, PromoKind};
    use crate::store::{KeyValueStore, MemoryStore, StorageError};

    fn shop() -> Shop { Shop::new(Storage::in_memory(), &AppConfig::default()) }

    fn stocked(shop: &mut Shop, name: &str, price: i64, stock: u32) -> Product {
        shop.create_product(draft(name, Decimal::new(price, 0), stock, 0)).unwrap()
    }

    fn checkout_request(email: &str, promo: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            customer: Customer { name: "Test Buyer".into(), email: email.into(), phone: None },
            shipping_address: ShippingAddress { address: "12 Nile St".into(), city: "Cairo".into(), state: "Cairo".into(), postal_code: "11511".into() },
            payment_method: "Credit Card".into(),
            promo_code: promo.map(str::to_string),
        }
    }

    #[test]
    fn test_cart_merges_and_persists() {
        let mut shop = shop();
        let p = stocked(&mut shop, "Lamp", 100, 5);
        shop.add_to_cart("s1", p.id(), 1).unwrap();
        let cart = shop.add_to_cart("s1", p.id(), 2).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(shop.cart("s1").total_items(), 3);
        assert!(matches!(shop.add_to_cart("s1", p.id(), 3), Err(ShopError::Cart(CartError::InsufficientStock { .. }))));
        assert!(matches!(shop.add_to_cart("s1", "missing", 1), Err(ShopError::NotFound { .. })));
        assert!(shop.decrement_cart_item("s1", p.id()).is_ok());
        assert_eq!(shop.cart("s1").total_items(), 2);
        shop.clear_cart("s1").unwrap();
        assert!(shop.cart("s1").is_empty());
    }

    #[test]
    fn test_checkout_creates_paid_order_and_decrements_stock() {
        let mut shop = shop();
        let p = stocked(&mut shop, "Chair", 300, 4);
        shop.add_to_cart("s1", p.id(), 2).unwrap();
        let order = shop.checkout("s1", checkout_request("buyer@example.com", None)).unwrap();
        assert_eq!(order.status(), OrderStatus::Processing);
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
        assert_eq!(order.subtotal().amount(), Decimal::new(600, 0));
        assert!(order.shipping().is_zero());
        assert_eq!(shop.get_product(p.id()).unwrap().stock().value(), 2);
        assert!(shop.cart("s1").is_empty());
        assert_eq!(shop.list_orders(&OrderFilter::default()).len(), 1);
    }

    #[test]
    fn test_checkout_empty_cart_fails() {
        let mut shop = shop();
        assert!(matches!(shop.checkout("nobody", checkout_request("a@example.com", None)), Err(ShopError::EmptyCart)));
    }

    #[test]
    fn test_checkout_with_promo_records_redemption() {
        let mut shop = shop();
        let p = stocked(&mut shop, "Camera", 1000, 10);
        shop.create_promo_code(promo_draft("save10", PromoKind::Percentage, 10, 0)).unwrap();
        shop.add_to_cart("s1", p.id(), 1).unwrap();
        let order = shop.checkout("s1", checkout_request("buyer@example.com", Some("SAVE10"))).unwrap();
        assert_eq!(order.discount().amount(), Decimal::new(100, 0));
        assert_eq!(order.total().amount(), Decimal::new(900, 0));
        assert_eq!(shop.list_promo_codes(Some("save")).first().map(PromoCode::used_count), Some(1));

        shop.add_to_cart("s1", p.id(), 1).unwrap();
        let again = shop.checkout("s1", checkout_request("BUYER@example.com", Some("save10")));
        assert!(matches!(again, Err(ShopError::Promo(PromoError::PerUserLimitReached))));
        assert_eq!(shop.cart("s1").total_items(), 1);
    }

    /// Memory store that refuses writes to one key.
    struct FailingStore { inner: MemoryStore, key: &'static str }

    impl KeyValueStore for FailingStore {
        fn get(&self, key: &str) -> Option<String> { self.inner.get(key) }
        fn set(&mut self, key: &str, value: String) -> std::result::Result<(), StorageError> {
            if key == self.key { return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into()); }
            self.inner.set(key, value)
        }
        fn remove(&mut self, key: &str) -> std::result::Result<(), StorageError> { self.inner.remove(key) }
    }

    #[test]
    fn test_failed_order_write_leaves_promo_and_stock_untouched() {
        let mut shop = Shop::new(Storage::new(FailingStore { inner: MemoryStore::new(), key: keys::ORDERS }), &AppConfig::default());
        let p = stocked(&mut shop, "Camera", 1000, 5);
        shop.create_promo_code(promo_draft("save10", PromoKind::Percentage, 10, 0)).unwrap();
        shop.add_to_cart("s1", p.id(), 2).unwrap();
        assert!(matches!(shop.checkout("s1", checkout_request("buyer@example.com", Some("SAVE10"))), Err(ShopError::Storage(_))));
        let redemptions: Vec<PromoRedemption> = shop.storage.load_list(keys::PROMO_REDEMPTIONS);
        assert!(redemptions.is_empty());
        assert_eq!(shop.list_promo_codes(Some("save10"))[0].used_count(), 0);
        assert_eq!(shop.get_product(p.id()).unwrap().stock().value(), 5);
        assert_eq!(shop.cart("s1").total_items(), 2);
    }

    #[test]
    fn test_cancel_restocks_items() {
        let mut shop = shop();
        let p = stocked(&mut shop, "Shoes", 200, 3);
        shop.add_to_cart("s1", p.id(), 3).unwrap();
        let order = shop.checkout("s1", checkout_request("buyer@example.com", None)).unwrap();
        assert_eq!(shop.get_product(p.id()).unwrap().stock().value(), 0);
        let cancelled = shop.update_order_status(order.id(), OrderStatus::Cancelled).unwrap();
        assert_eq!(cancelled.payment_status(), PaymentStatus::Refunded);
        assert_eq!(shop.get_product(p.id()).unwrap().stock().value(), 3);
        assert!(shop.update_order_status(order.id(), OrderStatus::Shipped).is_err());
    }

    #[test]
    fn test_promo_codes_are_unique() {
        let mut shop = shop();
        let first = shop.create_promo_code(promo_draft("DEAL", PromoKind::Fixed, 50, 0)).unwrap();
        assert!(matches!(shop.create_promo_code(promo_draft("deal", PromoKind::Fixed, 20, 0)), Err(ShopError::Conflict(_))));
        assert!(shop.update_promo_code(first.id(), promo_draft("deal", PromoKind::Fixed, 20, 0)).is_ok());
        assert!(!shop.toggle_promo_code(first.id()).unwrap().is_active());
        assert!(matches!(shop.validate_promo_code("DEAL", Decimal::new(100, 0), None), Err(ShopError::Promo(PromoError::Inactive))));
        assert!(matches!(shop.validate_promo_code("NOPE", Decimal::new(100, 0), None), Err(ShopError::Promo(PromoError::NotFound))));
    }

    #[test]
    fn test_categories_count_products() {
        let mut shop = shop();
        shop.storage.save_list(keys::CATEGORIES, &crate::seed::categories()).unwrap();
        stocked(&mut shop, "Phone", 10, 1);
        let mut d = draft("Kettle", Decimal::TEN, 1, 0);
        d.category = "kitchen".into();
        shop.create_product(d).unwrap();
        let categories = shop.categories();
        assert_eq!(categories.iter().find(|c| c.id == "electronics").map(|c| c.product_count), Some(1));
        assert_eq!(categories.iter().find(|c| c.id == "kitchen").map(|c| c.name.as_str()), Some("Kitchen"));
    }

    #[test]
    fn test_ticket_thread() {
        let mut shop = shop();
        let customer = Customer { name: "Mona".into(), email: "mona@example.com".into(), phone: None };
        let ticket = shop.open_ticket("Late parcel", customer, "Where is it?").unwrap();
        let t = shop.post_ticket_message(ticket.id(), Sender::Agent, "On its way").unwrap();
        assert_eq!(t.status(), TicketStatus::Answered);
        let t = shop.post_ticket_message(ticket.id(), Sender::Customer, "Thanks, still waiting").unwrap();
        assert_eq!(t.status(), TicketStatus::InProgress);
        shop.close_ticket(ticket.id()).unwrap();
        assert!(shop.post_ticket_message(ticket.id(), Sender::Customer, "Hello?").is_err());
        assert_eq!(shop.list_tickets(&TicketFilter { status: Some(TicketStatus::Closed), ..Default::default() }).len(), 1);
    }

    #[test]
    fn test_accent_color_defaults_to_blue() {
        let mut shop = shop();
        assert_eq!(shop.accent_color(), AccentColor::Blue);
        shop.set_accent_color(AccentColor::Purple).unwrap();
        assert_eq!(shop.accent_color(), AccentColor::Purple);
    }

    #[test]
    fn test_wishlist_and_comments() {
        let mut shop = shop();
        let p = stocked(&mut shop, "Watch", 500, 2);
        let user = shop.add_user(User::new("Omar Ali", "omar@example.com", None, "EGP")).unwrap();
        shop.add_to_wishlist(user.id(), p.id()).unwrap();
        let u = shop.add_to_wishlist(user.id(), p.id()).unwrap();
        assert_eq!(u.wishlist().len(), 1);
        let comment = shop.add_comment(p.id(), CommentForm { user_id: user.id().to_string(), rating: 4, text: "Nice".into() }).unwrap();
        assert_eq!(comment.user_name, "Omar Ali");
        assert_eq!(shop.product_rating(p.id()).unwrap(), Some(Decimal::new(400, 2)));
        assert!(matches!(shop.add_user(User::new("Other", "OMAR@example.com", None, "EGP")), Err(ShopError::Conflict(_))));
    }
}
