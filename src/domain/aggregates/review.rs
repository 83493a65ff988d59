//! Product comments with star ratings

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::value_objects::{new_id, round_cents};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductComment {
    pub id: String,
    pub product_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_image: Option<String>,
    pub rating: u8,
    pub text: String,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CommentForm {
    #[validate(length(min = 1, message = "user is required"))]
    pub user_id: String,
    #[validate(range(min = 1, max = 5))]
    #[serde(default = "default_rating")]
    pub rating: u8,
    #[validate(custom = "not_blank")]
    pub text: String,
}

fn default_rating() -> u8 { 5 }

fn not_blank(text: &str) -> Result<(), validator::ValidationError> {
    if text.trim().is_empty() { Err(validator::ValidationError::new("empty_comment")) } else { Ok(()) }
}

impl ProductComment {
    pub fn new(product_id: impl Into<String>, user_name: impl Into<String>, user_image: Option<String>, form: CommentForm) -> Result<Self, validator::ValidationErrors> {
        form.validate()?;
        Ok(Self {
            id: new_id("comment"), product_id: product_id.into(), user_id: form.user_id, user_name: user_name.into(), user_image,
            rating: form.rating, text: form.text.trim().to_string(), date: Utc::now(),
        })
    }
}

/// Mean rating rounded to two places, `None` without comments.
pub fn average_rating(comments: &[ProductComment]) -> Option<Decimal> {
    if comments.is_empty() { return None; }
    let sum: u32 = comments.iter().map(|c| u32::from(c.rating)).sum();
    Some(round_cents(Decimal::from(sum) / Decimal::from(comments.len())))
}
