//! Admin dashboard figures derived from orders, carts, users and tickets.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::{Cart, Order, OrderStatus, SupportTicket, TicketStatus, User};
use crate::domain::value_objects::{round_cents, Money};

const MONTHS: [&str; 12] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_revenue: Money,
    pub order_count: usize,
    pub customer_count: usize,
    pub active_customers: usize,
    pub average_order_value: Money,
    pub pending_orders: usize,
    pub open_tickets: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period { Week, Month, #[default] Year }

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SalesPoint { pub label: String, pub sales: Decimal, pub orders: u32 }

/// Which customer behaviour rate to chart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior { #[default] Cart, Retention }

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BehaviorPoint { pub date: String, pub rate: Decimal }

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TopProduct { pub name: String, pub sales: Decimal, pub units: u32 }

fn counts_as_sale(order: &Order) -> bool { order.status() != OrderStatus::Cancelled }

pub fn dashboard_stats(orders: &[Order], users: &[User], tickets: &[SupportTicket], currency: &str) -> DashboardStats {
    let sold: Vec<&Order> = orders.iter().filter(|o| counts_as_sale(o)).collect();
    let revenue: Decimal = sold.iter().map(|o| o.total().amount()).sum();
    let average = if sold.is_empty() { Decimal::ZERO } else { round_cents(revenue / Decimal::from(sold.len())) };
    DashboardStats {
        total_revenue: Money::new(revenue, currency),
        order_count: orders.len(),
        customer_count: users.len(),
        active_customers: users.iter().filter(|u| u.is_active()).count(),
        average_order_value: Money::new(average, currency),
        pending_orders: orders.iter().filter(|o| o.status() == OrderStatus::Pending).count(),
        open_tickets: tickets.iter().filter(|t| t.status() != TicketStatus::Closed).count(),
    }
}

/// Sales and order counts bucketed by `period`, oldest bucket first.
pub fn sales_series(orders: &[Order], period: Period, now: DateTime<Utc>) -> Vec<SalesPoint> {
    let today = now.date_naive();
    let mut points: Vec<SalesPoint> = match period {
        Period::Week => (0..7).rev().map(|back| (today - Duration::days(back)).format("%a").to_string()).map(empty_point).collect(),
        Period::Month => (1..=4).map(|w| format!("Week {w}")).map(empty_point).collect(),
        Period::Year => MONTHS.iter().map(|m| empty_point(m.to_string())).collect(),
    };
    for order in orders.iter().filter(|o| counts_as_sale(o)) {
        let day = order.date().date_naive();
        let age = (today - day).num_days();
        let bucket = match period {
            Period::Week if (0..7).contains(&age) => Some(6 - age as usize),
            Period::Month if (0..28).contains(&age) => Some(3 - (age / 7) as usize),
            Period::Year if day.year() == today.year() => Some(day.month0() as usize),
            _ => None,
        };
        if let Some(point) = bucket.and_then(|i| points.get_mut(i)) {
            point.sales += order.total().amount();
            point.orders += 1;
        }
    }
    points
}

fn empty_point(label: String) -> SalesPoint { SalesPoint { label, sales: Decimal::ZERO, orders: 0 } }

const BEHAVIOR_DAYS: i64 = 7;

/// Daily percentage over the last week, oldest day first.
///
/// `Cart` is the abandonment rate: open carts last touched that day against
/// those carts plus the orders placed that day. `Retention` is the share of
/// that day's orders placed by a customer who had ordered before.
pub fn customer_behavior(kind: Behavior, carts: &[Cart], orders: &[Order], now: DateTime<Utc>) -> Vec<BehaviorPoint> {
    let today = now.date_naive();
    let mut by_date: Vec<&Order> = orders.iter().collect();
    by_date.sort_by_key(|o| o.date());

    (0..BEHAVIOR_DAYS).rev().map(|back| {
        let day = today - Duration::days(back);
        let placed = by_date.iter().filter(|o| o.date().date_naive() == day).count();
        let (part, whole) = match kind {
            Behavior::Cart => {
                let open = carts.iter().filter(|c| !c.is_empty() && c.updated_at().date_naive() == day).count();
                (open, open + placed)
            }
            Behavior::Retention => {
                let mut seen: HashSet<String> = HashSet::new();
                let mut repeat = 0;
                for order in by_date.iter().take_while(|o| o.date().date_naive() <= day) {
                    let fresh = seen.insert(order.customer().email.trim().to_lowercase());
                    if order.date().date_naive() == day && !fresh { repeat += 1; }
                }
                (repeat, placed)
            }
        };
        BehaviorPoint { date: day.format("%b %-d").to_string(), rate: percentage(part, whole) }
    }).collect()
}

fn percentage(part: usize, whole: usize) -> Decimal {
    if whole == 0 { return Decimal::ZERO; }
    round_cents(Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole))
}

/// Best sellers by line revenue across non-cancelled orders.
pub fn top_products(orders: &[Order], limit: usize) -> Vec<TopProduct> {
    let mut totals: HashMap<&str, (Decimal, u32)> = HashMap::new();
    for item in orders.iter().filter(|o| counts_as_sale(o)).flat_map(|o| o.items()) {
        let entry = totals.entry(item.name.as_str()).or_insert((Decimal::ZERO, 0));
        entry.0 += item.price.multiply(item.quantity).amount();
        entry.1 += item.quantity;
    }
    let mut ranked: Vec<TopProduct> = totals.into_iter().map(|(name, (sales, units))| TopProduct { name: name.to_string(), sales, units }).collect();
    ranked.sort_by(|a, b| b.sales.cmp(&a.sales).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    ranked
}
