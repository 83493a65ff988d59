//! Promo code aggregate

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use crate::domain::value_objects::{new_id, Money};
use crate::domain::events::{DomainEvent, PromoEvent};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    id: String,
    code: String,
    #[serde(rename = "type")]
    kind: PromoKind,
    value: Decimal,
    /// Zero means unlimited.
    max_uses: u32,
    /// Zero means unlimited.
    max_uses_per_user: u32,
    min_order_amount: Decimal,
    expiry_date: DateTime<Utc>,
    is_active: bool,
    used_count: u32,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoKind { Percentage, Fixed, FreeShipping }

/// What a valid code takes off an order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromoDiscount { Amount(Money), FreeShipping }

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_promo_value", skip_on_field_errors = false))]
pub struct PromoDraft {
    #[validate(length(min = 3, max = 32, message = "code must be 3 to 32 characters"), custom = "validate_code_chars")]
    pub code: String,
    #[serde(rename = "type")]
    pub kind: PromoKind,
    #[serde(default)]
    pub value: Decimal,
    #[serde(default)]
    pub max_uses: u32,
    #[serde(default)]
    pub max_uses_per_user: u32,
    #[serde(default)]
    pub min_order_amount: Decimal,
    /// Last valid day; the code expires at the end of it.
    pub expiry_date: NaiveDate,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool { true }

fn validate_code_chars(code: &str) -> Result<(), ValidationError> {
    if code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') { Ok(()) }
    else { Err(ValidationError::new("code_characters")) }
}

fn validate_promo_value(draft: &PromoDraft) -> Result<(), ValidationError> {
    if draft.value.is_sign_negative() || draft.min_order_amount.is_sign_negative() { return Err(ValidationError::new("negative_amount")); }
    match draft.kind {
        PromoKind::Percentage if draft.value.is_zero() || draft.value > Decimal::ONE_HUNDRED => Err(ValidationError::new("percentage_range")),
        PromoKind::Fixed if draft.value.is_zero() => Err(ValidationError::new("fixed_amount_required")),
        _ => Ok(()),
    }
}

impl PromoCode {
    pub fn create(draft: PromoDraft) -> Result<Self, PromoError> {
        draft.validate()?;
        let mut promo = Self {
            id: new_id("promo"), code: String::new(), kind: draft.kind, value: Decimal::ZERO, max_uses: 0, max_uses_per_user: 0,
            min_order_amount: Decimal::ZERO, expiry_date: Utc::now(), is_active: true, used_count: 0, created_at: Utc::now(), events: vec![],
        };
        promo.apply(draft);
        Ok(promo)
    }

    pub fn with_history(mut self, id: impl Into<String>, used_count: u32, created_at: DateTime<Utc>) -> Self {
        self.id = id.into(); self.used_count = used_count; self.created_at = created_at;
        self
    }

    pub fn update(&mut self, draft: PromoDraft) -> Result<(), PromoError> {
        draft.validate()?;
        self.apply(draft);
        Ok(())
    }

    fn apply(&mut self, draft: PromoDraft) {
        self.code = normalize_code(&draft.code);
        self.kind = draft.kind;
        self.value = if draft.kind == PromoKind::FreeShipping { Decimal::ZERO } else { draft.value };
        self.max_uses = draft.max_uses;
        self.max_uses_per_user = draft.max_uses_per_user;
        self.min_order_amount = draft.min_order_amount;
        self.expiry_date = end_of_day(draft.expiry_date);
        self.is_active = draft.is_active;
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn code(&self) -> &str { &self.code }
    pub fn kind(&self) -> PromoKind { self.kind }
    pub fn value(&self) -> Decimal { self.value }
    pub fn used_count(&self) -> u32 { self.used_count }
    pub fn is_active(&self) -> bool { self.is_active }
    pub fn min_order_amount(&self) -> Decimal { self.min_order_amount }
    pub fn expiry_date(&self) -> DateTime<Utc> { self.expiry_date }
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now > self.expiry_date }
    pub fn matches_code(&self, code: &str) -> bool { self.code == normalize_code(code) }

    pub fn set_active(&mut self, active: bool) { self.is_active = active; }

    /// Checks every usage rule in order: active, expiry, global cap, per-customer cap, minimum subtotal.
    pub fn check_eligibility(&self, subtotal: &Money, now: DateTime<Utc>, customer_uses: u32) -> Result<(), PromoError> {
        if !self.is_active { return Err(PromoError::Inactive); }
        if self.is_expired(now) { return Err(PromoError::Expired); }
        if self.max_uses > 0 && self.used_count >= self.max_uses { return Err(PromoError::UsageLimitReached); }
        if self.max_uses_per_user > 0 && customer_uses >= self.max_uses_per_user { return Err(PromoError::PerUserLimitReached); }
        if subtotal.amount() < self.min_order_amount { return Err(PromoError::BelowMinimum { minimum: self.min_order_amount }); }
        Ok(())
    }

    pub fn discount_for(&self, subtotal: &Money) -> PromoDiscount {
        match self.kind {
            PromoKind::Percentage => PromoDiscount::Amount(subtotal.percent_of(self.value)),
            PromoKind::Fixed => PromoDiscount::Amount(subtotal.min(&Money::new(self.value, subtotal.currency()))),
            PromoKind::FreeShipping => PromoDiscount::FreeShipping,
        }
    }

    pub fn redeem(&mut self) {
        self.used_count = self.used_count.saturating_add(1);
        self.raise_event(DomainEvent::Promo(PromoEvent::Redeemed { promo_id: self.id.clone(), code: self.code.clone(), used_count: self.used_count }));
        if self.max_uses > 0 && self.used_count >= self.max_uses {
            self.raise_event(DomainEvent::Promo(PromoEvent::Exhausted { promo_id: self.id.clone(), code: self.code.clone() }));
        }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

/// One use of a promo code by a customer, keyed by email.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoRedemption { pub promo_id: String, pub customer_email: String, pub order_id: String, pub redeemed_at: DateTime<Utc> }

pub fn normalize_code(code: &str) -> String { code.trim().to_uppercase() }

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(23, 59, 59).map(|dt| dt.and_utc()).unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN).and_utc())
}

#[derive(Debug, thiserror::Error)]
pub enum PromoError {
    #[error("invalid promo code: {0}")]
    Invalid(#[from] validator::ValidationErrors),
    #[error("promo code not found")]
    NotFound,
    #[error("promo code is not active")]
    Inactive,
    #[error("promo code has expired")]
    Expired,
    #[error("promo code usage limit reached")]
    UsageLimitReached,
    #[error("promo code already used the maximum number of times by this customer")]
    PerUserLimitReached,
    #[error("order subtotal is below the minimum of EGP {minimum}")]
    BelowMinimum { minimum: Decimal },
}

#[cfg(test)]
pub(crate) fn promo_draft(code: &str, kind: PromoKind, value: i64, min_order: i64) -> PromoDraft {
    PromoDraft {
        code: code.into(), kind, value: Decimal::new(value, 0), max_uses: 0, max_uses_per_user: 1,
        min_order_amount: Decimal::new(min_order, 0), expiry_date: NaiveDate::from_ymd_opt(2099, 12, 31).unwrap(), is_active: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn egp(v: i64) -> Money { Money::egp(Decimal::new(v, 0)) }

    #[test]
    fn test_create_normalizes_code() {
        let p = PromoCode::create(promo_draft(" welcome10 ", PromoKind::Percentage, 10, 0)).unwrap();
        assert_eq!(p.code(), "WELCOME10");
        assert!(p.matches_code("Welcome10"));
        assert_eq!(p.expiry_date().to_rfc3339(), "2099-12-31T23:59:59+00:00");
    }

    #[test]
    fn test_draft_validation() {
        assert!(PromoCode::create(promo_draft("BAD CODE", PromoKind::Fixed, 10, 0)).is_err());
        assert!(PromoCode::create(promo_draft("PCT", PromoKind::Percentage, 150, 0)).is_err());
        assert!(PromoCode::create(promo_draft("FIX", PromoKind::Fixed, 0, 0)).is_err());
        let ship = PromoCode::create(promo_draft("SHIP", PromoKind::FreeShipping, 99, 0)).unwrap();
        assert!(ship.value().is_zero());
    }

    #[test]
    fn test_eligibility_rules() {
        let now = Utc::now();
        let mut p = PromoCode::create(promo_draft("SUMMER20", PromoKind::Percentage, 20, 1000)).unwrap();
        assert!(matches!(p.check_eligibility(&egp(999), now, 0), Err(PromoError::BelowMinimum { .. })));
        assert!(p.check_eligibility(&egp(1000), now, 0).is_ok());
        assert!(matches!(p.check_eligibility(&egp(1000), now, 1), Err(PromoError::PerUserLimitReached)));
        p.set_active(false);
        assert!(matches!(p.check_eligibility(&egp(1000), now, 0), Err(PromoError::Inactive)));
        p.set_active(true);
        let later = p.expiry_date() + chrono::Duration::seconds(1);
        assert!(matches!(p.check_eligibility(&egp(1000), later, 0), Err(PromoError::Expired)));
    }

    #[test]
    fn test_usage_cap() {
        let mut d = promo_draft("FIXED100", PromoKind::Fixed, 100, 0);
        d.max_uses = 1;
        let mut p = PromoCode::create(d).unwrap();
        p.redeem();
        assert_eq!(p.used_count(), 1);
        assert!(matches!(p.check_eligibility(&egp(500), Utc::now(), 0), Err(PromoError::UsageLimitReached)));
        assert_eq!(p.take_events().len(), 2);
    }

    #[test]
    fn test_discounts() {
        let pct = PromoCode::create(promo_draft("P10", PromoKind::Percentage, 10, 0)).unwrap();
        assert_eq!(pct.discount_for(&Money::egp(Decimal::new(259997, 2))), PromoDiscount::Amount(Money::egp(Decimal::new(26000, 2))));
        let fixed = PromoCode::create(promo_draft("F100", PromoKind::Fixed, 100, 0)).unwrap();
        assert_eq!(fixed.discount_for(&egp(60)), PromoDiscount::Amount(egp(60)));
        assert_eq!(fixed.discount_for(&egp(600)), PromoDiscount::Amount(egp(100)));
        let ship = PromoCode::create(promo_draft("SHIP", PromoKind::FreeShipping, 0, 0)).unwrap();
        assert_eq!(ship.discount_for(&egp(600)), PromoDiscount::FreeShipping);
    }
}
