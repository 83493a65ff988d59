//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::aggregates::{OrderStatus, TicketStatus};

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
    Promo(PromoEvent),
    Ticket(TicketEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: String },
    InventoryRemoved { product_id: String, quantity: u32 },
    InventoryRestored { product_id: String, quantity: u32 },
    LowStock { product_id: String, remaining: u32 },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: String, customer_email: String },
    Confirmed { order_id: String, total: Decimal },
    Paid { order_id: String },
    StatusChanged { order_id: String, from: OrderStatus, to: OrderStatus },
    Refunded { order_id: String },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PromoEvent {
    Redeemed { promo_id: String, code: String, used_count: u32 },
    Exhausted { promo_id: String, code: String },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TicketEvent {
    Opened { ticket_id: String },
    MessageAdded { ticket_id: String, message_id: String },
    StatusChanged { ticket_id: String, from: TicketStatus, to: TicketStatus },
}
