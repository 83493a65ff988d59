//! Checkout pricing: shipping policy, promo discounts and totals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::{OrderTotals, PromoCode, PromoDiscount, PromoError};
use crate::domain::value_objects::{Money, MoneyError};

#[derive(Clone, Debug)]
pub struct ShippingPolicy {
    /// Subtotals at or above this ship free (measured before promo discounts).
    pub free_shipping_threshold: Decimal,
    pub flat_fee: Decimal,
}

impl Default for ShippingPolicy {
    fn default() -> Self { Self { free_shipping_threshold: Decimal::new(500, 0), flat_fee: Decimal::new(50, 0) } }
}

impl ShippingPolicy {
    pub fn shipping_for(&self, subtotal: &Money) -> Money {
        if subtotal.is_zero() || subtotal.amount() >= self.free_shipping_threshold { Money::zero(subtotal.currency()) }
        else { Money::new(self.flat_fee, subtotal.currency()) }
    }
}

/// A promo code as applied for one customer.
pub struct AppliedPromo<'a> { pub promo: &'a PromoCode, pub customer_uses: u32 }

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub subtotal: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
    pub promo_code: Option<String>,
    pub shipping_waived: bool,
}

impl PriceQuote {
    pub fn totals(&self) -> OrderTotals {
        OrderTotals { subtotal: self.subtotal.clone(), shipping: self.shipping.clone(), discount: self.discount.clone(), total: self.total.clone() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error(transparent)]
    Promo(#[from] PromoError),
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Prices a subtotal: shipping from the policy, then the promo (if any), total floored at zero.
pub fn quote(subtotal: &Money, policy: &ShippingPolicy, promo: Option<AppliedPromo<'_>>, now: DateTime<Utc>) -> Result<PriceQuote, PricingError> {
    let mut shipping = policy.shipping_for(subtotal);
    let mut discount = Money::zero(subtotal.currency());
    let mut shipping_waived = false;
    let mut promo_code = None;
    if let Some(applied) = promo {
        applied.promo.check_eligibility(subtotal, now, applied.customer_uses)?;
        match applied.promo.discount_for(subtotal) {
            PromoDiscount::Amount(amount) => discount = amount,
            PromoDiscount::FreeShipping => {
                shipping_waived = !shipping.is_zero();
                shipping = Money::zero(subtotal.currency());
            }
        }
        promo_code = Some(applied.promo.code().to_string());
    }
    let total = subtotal.add(&shipping)?.saturating_sub(&discount)?;
    Ok(PriceQuote { subtotal: subtotal.clone(), shipping, discount, total, promo_code, shipping_waived })
}
