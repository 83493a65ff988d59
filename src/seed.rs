//! Sample catalogue, customers, orders, promo codes and tickets written on first start.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::aggregates::{
    AddressForm, Category, Customer, LineItem, Message, Order, OrderStatus, OrderTotals, PaymentStatus, Product, ProductDraft,
    PromoCode, PromoDraft, PromoKind, Sender, ShippingAddress, Specification, SupportTicket, TicketStatus, User,
};
use crate::domain::value_objects::Money;
use crate::store::{keys, Storage, StorageError};

/// Writes each sample collection whose key is still absent. Returns the keys written.
pub fn seed_if_empty(storage: &mut Storage, currency: &str) -> Result<Vec<&'static str>, StorageError> {
    let mut written = vec![];
    if !storage.contains(keys::CATEGORIES) { storage.save_list(keys::CATEGORIES, &categories())?; written.push(keys::CATEGORIES); }
    if !storage.contains(keys::PRODUCTS) { storage.save_list(keys::PRODUCTS, &products(currency))?; written.push(keys::PRODUCTS); }
    if !storage.contains(keys::USERS) { storage.save_list(keys::USERS, &users(currency))?; written.push(keys::USERS); }
    if !storage.contains(keys::ORDERS) { storage.save_list(keys::ORDERS, &orders(currency))?; written.push(keys::ORDERS); }
    if !storage.contains(keys::PROMO_CODES) { storage.save_list(keys::PROMO_CODES, &promo_codes(Utc::now()))?; written.push(keys::PROMO_CODES); }
    if !storage.contains(keys::SUPPORT_TICKETS) { storage.save_list(keys::SUPPORT_TICKETS, &tickets())?; written.push(keys::SUPPORT_TICKETS); }
    Ok(written)
}

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single().unwrap_or_else(Utc::now)
}

fn cents(v: i64) -> Decimal { Decimal::new(v, 2) }

pub fn categories() -> Vec<Category> {
    [("electronics", "Electronics"), ("fashion", "Fashion"), ("home", "Home & Living"), ("sports", "Sports & Fitness")]
        .into_iter()
        .map(|(id, name)| Category { id: id.into(), name: name.into(), image: Some("/placeholder.svg?height=200&width=200".into()), product_count: 0 })
        .collect()
}

pub fn products(currency: &str) -> Vec<Product> {
    let rows: [(&str, &str, &str, i64, u32, u8, &str, bool); 13] = [
        ("prod-1", "Premium Wireless Headphones", "Noise-cancelling over-ear headphones with 30 hour battery life", 129_999, 15, 10, "electronics", true),
        ("prod-2", "Stylish Smartwatch", "Fitness tracking, notifications and a week of battery", 89_999, 12, 0, "electronics", true),
        ("prod-3", "Designer Sunglasses", "Polarized lenses with UV400 protection", 49_999, 25, 5, "fashion", true),
        ("prod-5", "Portable Bluetooth Speaker", "Waterproof speaker with deep bass", 59_999, 18, 0, "electronics", false),
        ("prod-6", "Fitness Tracker", "Heart rate, sleep and step tracking", 39_999, 30, 0, "sports", false),
        ("prod-7", "Leather Wallet", "Slim genuine leather wallet with RFID blocking", 24_999, 40, 0, "fashion", false),
        ("prod-9", "Smart Home Security Camera", "HD security camera with motion detection and night vision", 89_999, 10, 15, "electronics", false),
        ("prod-10", "Ergonomic Office Chair", "Comfortable chair with lumbar support for long working hours", 149_999, 7, 0, "home", false),
        ("prod-11", "Wireless Earbuds", "True wireless earbuds with noise isolation", 49_999, 22, 10, "electronics", false),
        ("prod-12", "Yoga Mat", "Non-slip yoga mat for all types of exercises", 19_999, 35, 0, "sports", false),
        ("prod-13", "Digital Camera", "High-resolution digital camera for professional photography", 249_999, 5, 0, "electronics", false),
        ("prod-14", "Coffee Maker", "Automatic coffee maker with timer and multiple brewing options", 69_999, 15, 5, "home", false),
        ("prod-15", "Running Shoes", "Lightweight and comfortable shoes for running and jogging", 79_999, 20, 0, "sports", false),
    ];
    rows.into_iter()
        .filter_map(|(id, name, description, price, stock, discount, category, featured)| {
            let specifications = if id == "prod-1" {
                vec![Specification { key: "Battery".into(), value: "30 hours".into() }, Specification { key: "Connectivity".into(), value: "Bluetooth 5.2".into() }]
            } else { vec![] };
            let draft = ProductDraft {
                name: name.into(), description: description.into(), price: cents(price), stock, discount, category: category.into(),
                featured, image: Some("/placeholder.svg?height=300&width=300".into()), specifications,
            };
            Product::create(draft, currency).ok().map(|p| p.with_id(id))
        })
        .collect()
}

pub fn users(currency: &str) -> Vec<User> {
    let rows = [
        ("user-1", "John Doe", "john.doe@example.com", "+20 123 456 7890", at(2023, 1, 15, 10, 30), 5, 789_995, at(2023, 4, 15, 10, 30), ("123 Main St", "Cairo", "12345")),
        ("user-2", "Jane Smith", "jane.smith@example.com", "+20 123 456 7891", at(2023, 2, 20, 14, 45), 3, 349_997, at(2023, 4, 16, 14, 45), ("456 Oak St", "Alexandria", "23456")),
        ("user-3", "Ahmed Hassan", "ahmed.hassan@example.com", "+20 123 456 7892", at(2023, 3, 5, 9, 15), 1, 169_997, at(2023, 4, 17, 9, 15), ("789 Pine St", "Giza", "34567")),
    ];
    rows.into_iter()
        .map(|(id, name, email, phone, joined, order_count, spent, last_order, (street, city, zip))| {
            let mut user = User::new(name, email, Some(phone.into()), currency)
                .with_history(id, joined, order_count, Money::new(cents(spent), currency), Some(last_order));
            let home = AddressForm { name: "Home".into(), address: street.into(), city: city.into(), state: city.into(), postal_code: zip.into(), is_default: true };
            if let Err(e) = user.add_address(home) { tracing::warn!(user = id, error = %e, "skipping sample address"); }
            user
        })
        .collect()
}

pub fn orders(currency: &str) -> Vec<Order> {
    let m = |v: i64| Money::new(cents(v), currency);
    let rows = [
        ("ORD-1234", "John Doe", "john.doe@example.com", at(2023, 4, 15, 10, 30), OrderStatus::Delivered, [259_997, 0, 10_000, 249_997], "Credit Card",
            ("123 Main St", "Cairo", "12345"), vec![("prod-1", "Premium Wireless Headphones", 129_999), ("prod-2", "Stylish Smartwatch", 89_999), ("prod-7", "Leather Wallet", 24_999)]),
        ("ORD-1235", "Jane Smith", "jane.smith@example.com", at(2023, 4, 16, 14, 45), OrderStatus::Shipped, [109_998, 0, 5_000, 104_998], "PayPal",
            ("456 Oak St", "Alexandria", "23456"), vec![("prod-5", "Portable Bluetooth Speaker", 59_999), ("prod-6", "Fitness Tracker", 39_999)]),
        ("ORD-1236", "Ahmed Hassan", "ahmed.hassan@example.com", at(2023, 4, 17, 9, 15), OrderStatus::Processing, [174_997, 5_000, 10_000, 169_997], "Credit Card",
            ("789 Pine St", "Giza", "34567"), vec![("prod-3", "Designer Sunglasses", 49_999), ("prod-10", "Ergonomic Office Chair", 149_999)]),
    ];
    rows.into_iter()
        .map(|(id, name, email, date, status, [subtotal, shipping, discount, total], payment, (street, city, zip), items)| {
            let customer = Customer { name: name.into(), email: email.into(), phone: None };
            let address = ShippingAddress { address: street.into(), city: city.into(), state: city.into(), postal_code: zip.into() };
            let totals = OrderTotals { subtotal: m(subtotal), shipping: m(shipping), discount: m(discount), total: m(total) };
            let mut order = Order::create(0, customer, address, payment, totals).backdated(id, date, status, PaymentStatus::Paid);
            for (product_id, product_name, price) in items {
                order.add_item(LineItem { id: product_id.into(), name: product_name.into(), price: m(price), quantity: 1 });
            }
            order
        })
        .collect()
}

/// Sample codes stay valid for a while after seeding.
pub fn promo_codes(now: DateTime<Utc>) -> Vec<PromoCode> {
    let rows = [
        ("promo-1", "WELCOME10", PromoKind::Percentage, 10, 0, 0, 365, 45),
        ("promo-2", "SUMMER20", PromoKind::Percentage, 20, 100, 1000, 90, 32),
        ("promo-3", "FREESHIP", PromoKind::FreeShipping, 0, 50, 500, 60, 28),
        ("promo-4", "FIXED100", PromoKind::Fixed, 100, 30, 1000, 120, 15),
    ];
    rows.into_iter()
        .filter_map(|(id, code, kind, value, max_uses, min_order, valid_days, used)| {
            let draft = PromoDraft {
                code: code.into(), kind, value: Decimal::from(value), max_uses, max_uses_per_user: 1,
                min_order_amount: Decimal::from(min_order), expiry_date: (now + Duration::days(valid_days)).date_naive(), is_active: true,
            };
            PromoCode::create(draft).ok().map(|p| p.with_history(id, used, now))
        })
        .collect()
}

pub fn tickets() -> Vec<SupportTicket> {
    let customer = |name: &str, email: &str, phone: &str| Customer { name: name.into(), email: email.into(), phone: Some(phone.into()) };
    let msg = |id: &str, sender: Sender, text: &str, ts: DateTime<Utc>| Message { id: id.into(), sender, text: text.into(), timestamp: ts };
    vec![
        SupportTicket::restore("ticket-1", "Order Delivery Delay", TicketStatus::New, customer("John Doe", "john.doe@example.com", "+20 123 456 7890"), vec![
            msg("msg-1", Sender::Customer, "My order #ORD-1234 was supposed to be delivered yesterday but I haven't received it yet. Can you please check the status?", at(2023, 4, 18, 10, 30)),
        ]),
        SupportTicket::restore("ticket-2", "Product Return Request", TicketStatus::InProgress, customer("Jane Smith", "jane.smith@example.com", "+20 123 456 7891"), vec![
            msg("msg-2", Sender::Customer, "I received the wrong product in my order #ORD-1235. I ordered a blue fitness tracker but received a black one.", at(2023, 4, 17, 14, 45)),
            msg("msg-3", Sender::Agent, "I'm sorry to hear about this mix-up. We'll arrange for a return and send you the correct color.", at(2023, 4, 17, 15, 30)),
        ]),
        SupportTicket::restore("ticket-3", "Payment Issue", TicketStatus::Answered, customer("Ahmed Hassan", "ahmed.hassan@example.com", "+20 123 456 7892"), vec![
            msg("msg-4", Sender::Customer, "I was charged twice for my order #ORD-1236. Please refund the duplicate charge.", at(2023, 4, 16, 9, 15)),
            msg("msg-5", Sender::Agent, "We've initiated a refund for the extra amount, which should be back in your account within 3-5 business days.", at(2023, 4, 16, 10, 30)),
        ]),
        SupportTicket::restore("ticket-4", "Product Information Request", TicketStatus::Closed, customer("Fatima Ali", "fatima.ali@example.com", "+20 123 456 7893"), vec![
            msg("msg-8", Sender::Customer, "Does the Smart Home Security Camera work with Google Home?", at(2023, 4, 15, 16, 20)),
            msg("msg-9", Sender::Agent, "It is compatible with both Google Home and Alexa.", at(2023, 4, 15, 16, 45)),
        ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_writes_only_missing_keys() {
        let mut storage = Storage::in_memory();
        storage.save_list::<Product>(keys::PRODUCTS, &[]).unwrap();
        let written = seed_if_empty(&mut storage, "EGP").unwrap();
        assert!(!written.contains(&keys::PRODUCTS));
        assert!(written.contains(&keys::ORDERS));
        assert!(storage.load_list::<Product>(keys::PRODUCTS).is_empty());
        assert!(seed_if_empty(&mut storage, "EGP").unwrap().is_empty());
    }

    #[test]
    fn test_sample_data_is_consistent() {
        let products = products("EGP");
        assert_eq!(products.len(), 13);
        assert!(products.iter().any(|p| p.id() == "prod-9" && p.discount().value() == 15));
        let orders = orders("EGP");
        assert_eq!(orders[0].id(), "ORD-1234");
        assert_eq!(orders[0].items().len(), 3);
        assert_eq!(users("EGP")[0].default_address().map(|a| a.city.as_str()), Some("Cairo"));
        let promos = promo_codes(Utc::now());
        assert_eq!(promos.len(), 4);
        assert!(promos.iter().all(|p| !p.is_expired(Utc::now())));
        assert_eq!(tickets()[2].status(), TicketStatus::Answered);
    }
}
