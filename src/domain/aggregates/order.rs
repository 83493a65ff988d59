//! Order Aggregate

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::value_objects::Money;
use crate::domain::events::{DomainEvent, OrderEvent};

/// Days between checkout and the estimated delivery date.
pub const DELIVERY_ESTIMATE_DAYS: i64 = 3;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: String,
    customer: Customer,
    date: DateTime<Utc>,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_method: String,
    items: Vec<LineItem>,
    subtotal: Money,
    shipping: Money,
    discount: Money,
    total: Money,
    shipping_address: ShippingAddress,
    promo_code: Option<String>,
    estimated_delivery: Option<DateTime<Utc>>,
    /// Set when placing the order took the items out of inventory.
    #[serde(default)]
    stock_reserved: bool,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)] pub struct LineItem { pub id: String, pub name: String, pub price: Money, pub quantity: u32 }

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct Customer {
    #[validate(length(min = 2, message = "name is required"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 5, message = "address is required"))]
    pub address: String,
    #[validate(length(min = 2, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 2, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 4, message = "postal code is required"))]
    pub postal_code: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed, Refunded }

impl OrderStatus {
    pub fn is_terminal(&self) -> bool { matches!(self, Self::Delivered | Self::Cancelled) }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!((self, next), (Pending, Processing) | (Pending, Cancelled) | (Processing, Shipped) | (Processing, Cancelled) | (Shipped, Delivered))
    }
}

/// Totals computed by checkout pricing.
#[derive(Clone, Debug)] pub struct OrderTotals { pub subtotal: Money, pub shipping: Money, pub discount: Money, pub total: Money }

impl Order {
    pub fn create(order_number: u32, customer: Customer, shipping_address: ShippingAddress, payment_method: impl Into<String>, totals: OrderTotals) -> Self {
        let now = Utc::now();
        let id = format!("ORD-{order_number:06}");
        let mut order = Self {
            id: id.clone(), customer, date: now, status: OrderStatus::Pending, payment_status: PaymentStatus::Pending,
            payment_method: payment_method.into(), items: vec![], subtotal: totals.subtotal, shipping: totals.shipping,
            discount: totals.discount, total: totals.total, shipping_address, promo_code: None, estimated_delivery: None,
            stock_reserved: false, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Created { order_id: id, customer_email: order.customer.email.clone() }));
        order
    }

    /// Imported historical orders keep their id and date.
    pub fn backdated(mut self, id: impl Into<String>, date: DateTime<Utc>, status: OrderStatus, payment_status: PaymentStatus) -> Self {
        self.id = id.into(); self.date = date; self.updated_at = date; self.status = status; self.payment_status = payment_status;
        self.stock_reserved = false;
        self.events.clear();
        self
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn customer(&self) -> &Customer { &self.customer }
    pub fn date(&self) -> DateTime<Utc> { self.date }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn shipping(&self) -> &Money { &self.shipping }
    pub fn discount(&self) -> &Money { &self.discount }
    pub fn total(&self) -> &Money { &self.total }
    pub fn promo_code(&self) -> Option<&str> { self.promo_code.as_deref() }
    pub fn estimated_delivery(&self) -> Option<DateTime<Utc>> { self.estimated_delivery }
    pub fn stock_reserved(&self) -> bool { self.stock_reserved }

    pub fn add_item(&mut self, item: LineItem) { self.items.push(item); self.touch(); }
    pub fn set_promo_code(&mut self, code: impl Into<String>) { self.promo_code = Some(code.into()); }
    pub fn mark_stock_reserved(&mut self) { self.stock_reserved = true; }

    /// Case-insensitive match on order id, customer name or email.
    pub fn matches(&self, search: &str) -> bool {
        let q = search.trim().to_lowercase();
        q.is_empty() || self.id.to_lowercase().contains(&q) || self.customer.name.to_lowercase().contains(&q) || self.customer.email.to_lowercase().contains(&q)
    }

    pub fn confirm(&mut self) -> Result<(), OrderError> {
        if self.items.is_empty() { return Err(OrderError::NoItems); }
        self.estimated_delivery = Some(Utc::now() + Duration::days(DELIVERY_ESTIMATE_DAYS));
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Confirmed { order_id: self.id.clone(), total: self.total.amount() }));
        Ok(())
    }

    /// Simulated payment capture; moves the order into processing.
    pub fn mark_paid(&mut self) -> Result<(), OrderError> {
        if self.payment_status != PaymentStatus::Pending { return Err(OrderError::PaymentNotPending); }
        self.payment_status = PaymentStatus::Paid;
        self.raise_event(DomainEvent::Order(OrderEvent::Paid { order_id: self.id.clone() }));
        self.transition_to(OrderStatus::Processing)
    }

    pub fn ship(&mut self) -> Result<(), OrderError> { self.transition_to(OrderStatus::Shipped) }
    pub fn deliver(&mut self) -> Result<(), OrderError> { self.transition_to(OrderStatus::Delivered) }

    /// Cancels the order, refunding a captured payment.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Cancelled)?;
        if self.payment_status == PaymentStatus::Paid {
            self.payment_status = PaymentStatus::Refunded;
            self.raise_event(DomainEvent::Order(OrderEvent::Refunded { order_id: self.id.clone() }));
        }
        Ok(())
    }

    /// Moves to `next`. Re-applying the current status is a no-op.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if self.status == next { return Ok(()); }
        if !self.status.can_transition_to(next) { return Err(OrderError::InvalidTransition { from: self.status, to: next }); }
        let from = self.status;
        self.status = next;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id.clone(), from, to: next }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,
    #[error("Payment is not pending")]
    PaymentNotPending,
    #[error("Cannot move order from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn order() -> Order {
        let m = |v: i64| Money::egp(Decimal::new(v, 0));
        let totals = OrderTotals { subtotal: m(20), shipping: m(50), discount: m(0), total: m(70) };
        let customer = Customer { name: "Test".into(), email: "test@example.com".into(), phone: None };
        let mut order = Order::create(1001, customer, ShippingAddress::default(), "Credit Card", totals);
        order.add_item(LineItem { id: "P1".into(), name: "Widget".into(), price: m(10), quantity: 2 });
        order
    }

    #[test]
    fn test_order_workflow() {
        let mut order = order();
        assert_eq!(order.id(), "ORD-001001");
        order.confirm().unwrap();
        assert!(order.estimated_delivery().is_some());
        order.mark_paid().unwrap();
        assert_eq!(order.status(), OrderStatus::Processing);
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
        order.ship().unwrap();
        assert_eq!(order.status(), OrderStatus::Shipped);
        order.deliver().unwrap();
        assert!(order.cancel().is_err());
        assert!(order.status().is_terminal());
    }

    #[test]
    fn test_backdated_orders_hold_no_stock() {
        let mut order = order();
        order.mark_stock_reserved();
        assert!(order.stock_reserved());
        let imported = order.backdated("ORD-1", Utc::now(), OrderStatus::Processing, PaymentStatus::Paid);
        assert!(!imported.stock_reserved());
    }

    #[test]
    fn test_confirm_requires_items() {
        let m = Money::egp(Decimal::ZERO);
        let totals = OrderTotals { subtotal: m.clone(), shipping: m.clone(), discount: m.clone(), total: m };
        let mut empty = Order::create(1, Customer::default(), ShippingAddress::default(), "Cash", totals);
        assert!(matches!(empty.confirm(), Err(OrderError::NoItems)));
    }

    #[test]
    fn test_cancel_paid_order_refunds() {
        let mut order = order();
        order.mark_paid().unwrap();
        order.cancel().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.payment_status(), PaymentStatus::Refunded);
        assert!(order.transition_to(OrderStatus::Processing).is_err());
    }

    #[test]
    fn test_transitions() {
        let mut order = order();
        assert!(order.transition_to(OrderStatus::Pending).is_ok());
        assert!(matches!(order.transition_to(OrderStatus::Delivered), Err(OrderError::InvalidTransition { .. })));
        let events = order.take_events();
        assert!(matches!(events[0], DomainEvent::Order(OrderEvent::Created { .. })));
    }

    #[test]
    fn test_matches() {
        let order = order();
        assert!(order.matches("ord-0010"));
        assert!(order.matches("EXAMPLE.com"));
        assert!(!order.matches("someone else"));
    }
}
