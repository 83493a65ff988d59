use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::domain::aggregates::{AccountError, CartError, OrderError, ProductError, PromoError, TicketError};
use crate::ShopError;

#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody { pub code: String, pub message: String }

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { status, error: ErrorBody { code: code.into(), message: message.into() } }
    }

    pub fn status(&self) -> StatusCode { self.status }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response { (self.status, Json(self)).into_response() }
}

impl From<ShopError> for ApiError {
    fn from(e: ShopError) -> Self {
        let (status, code) = match &e {
            ShopError::NotFound { .. } | ShopError::Promo(PromoError::NotFound) => (StatusCode::NOT_FOUND, "not_found"),
            ShopError::NoPendingRegistration(_) | ShopError::Cart(CartError::ItemNotFound) => (StatusCode::NOT_FOUND, "not_found"),
            ShopError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ShopError::Order(OrderError::InvalidTransition { .. }) | ShopError::Ticket(TicketError::Closed) => (StatusCode::CONFLICT, "conflict"),
            ShopError::Validation(_)
            | ShopError::Product(ProductError::Invalid(_))
            | ShopError::Promo(PromoError::Invalid(_))
            | ShopError::Account(AccountError::Invalid(_)) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            ShopError::Account(_) => (StatusCode::NOT_FOUND, "not_found"),
            ShopError::Storage(err) => {
                tracing::error!(error = %err, "storage operation failed");
                return ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "storage operation failed");
            }
            _ => (StatusCode::BAD_REQUEST, "bad_request"),
        };
        ApiError::new(status, code, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::OrderStatus;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(ShopError::not_found("product", "p1")).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(ShopError::Conflict("dup".into())).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(ShopError::EmptyCart).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(ShopError::Cart(CartError::InvalidQuantity)).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(ShopError::Cart(CartError::ItemNotFound)).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(ShopError::Promo(PromoError::Expired)).status(), StatusCode::BAD_REQUEST);
        let transition = OrderError::InvalidTransition { from: OrderStatus::Delivered, to: OrderStatus::Pending };
        assert_eq!(ApiError::from(ShopError::Order(transition)).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(ShopError::Validation(validator::ValidationErrors::new())).status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_body_carries_code_and_message() {
        let err = ApiError::from(ShopError::not_found("order", "ORD-1"));
        assert_eq!(err.error.code, "not_found");
        assert_eq!(err.error.message, "order ORD-1 not found");
    }
}
