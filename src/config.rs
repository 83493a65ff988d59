//! Environment-driven configuration.

use std::env::VarError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::pricing::ShippingPolicy;

const DEFAULT_PORT: u16 = 8083;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// JSON file backing the store; `None` keeps everything in memory.
    pub store_path: Option<PathBuf>,
    pub log_level: String,
    pub currency: String,
    pub shipping: ShippingPolicy,
    pub seed_sample_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            store_path: None,
            log_level: "info".to_string(),
            currency: "EGP".to_string(),
            shipping: ShippingPolicy::default(),
            seed_sample_data: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> { build_app_config(|key| std::env::var(key)) }
}

/// Builds the configuration from an arbitrary variable lookup.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let var = |key: &str| lookup(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let defaults = AppConfig::default();

    let bind_addr = match (var("BIND_ADDR"), var("PORT")) {
        (Some(addr), _) => parse("BIND_ADDR", &addr)?,
        (None, Some(port)) => SocketAddr::from(([0, 0, 0, 0], parse::<u16>("PORT", &port)?)),
        (None, None) => defaults.bind_addr,
    };

    let shipping = ShippingPolicy {
        free_shipping_threshold: var("FREE_SHIPPING_THRESHOLD").map(|v| parse_amount("FREE_SHIPPING_THRESHOLD", &v)).transpose()?.unwrap_or(defaults.shipping.free_shipping_threshold),
        flat_fee: var("FLAT_SHIPPING_FEE").map(|v| parse_amount("FLAT_SHIPPING_FEE", &v)).transpose()?.unwrap_or(defaults.shipping.flat_fee),
    };

    let currency = var("STORE_CURRENCY").map(|c| c.to_uppercase()).unwrap_or(defaults.currency);
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid("STORE_CURRENCY", "expected a three-letter currency code"));
    }

    Ok(AppConfig {
        bind_addr,
        store_path: var("STORE_PATH").map(PathBuf::from),
        log_level: var("LOG_LEVEL").unwrap_or(defaults.log_level),
        currency,
        shipping,
        seed_sample_data: var("SEED_SAMPLE_DATA").map(|v| parse_bool("SEED_SAMPLE_DATA", &v)).transpose()?.unwrap_or(defaults.seed_sample_data),
    })
}

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError { ConfigError::InvalidEnvVar { var: var.to_string(), reason: reason.into() } }

fn parse<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| invalid(var, e.to_string()))
}

fn parse_amount(var: &str, value: &str) -> Result<Decimal, ConfigError> {
    let amount: Decimal = parse(var, value)?;
    if amount.is_sign_negative() { return Err(invalid(var, "must not be negative")); }
    Ok(amount)
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(invalid(var, format!("expected a boolean, got {other:?}"))),
    }
}
