//! Request extractors whose rejections use the JSON error envelope.

use axum::{
    extract::{rejection::{JsonRejection, PathRejection, QueryRejection}, FromRequest, FromRequestParts},
    http::StatusCode,
};

use super::ApiError;

/// `axum::Json` with rejections reported as [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// `axum::extract::Query` with rejections reported as [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

/// `axum::extract::Path` with rejections reported as [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);

fn rejected(status: StatusCode, message: String) -> ApiError {
    let code = match status {
        StatusCode::UNPROCESSABLE_ENTITY => "validation_error",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported_media_type",
        StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
        s if s.is_server_error() => "internal_error",
        _ => "bad_request",
    };
    tracing::debug!(%status, %message, "request rejected");
    ApiError::new(status, code, message)
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self { rejected(r.status(), r.body_text()) }
}

impl From<QueryRejection> for ApiError {
    fn from(r: QueryRejection) -> Self { rejected(r.status(), r.body_text()) }
}

impl From<PathRejection> for ApiError {
    fn from(r: PathRejection) -> Self { rejected(r.status(), r.body_text()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_codes_follow_status() {
        assert_eq!(rejected(StatusCode::UNPROCESSABLE_ENTITY, "bad field".into()).error.code, "validation_error");
        assert_eq!(rejected(StatusCode::BAD_REQUEST, "syntax".into()).error.code, "bad_request");
        let err = rejected(StatusCode::UNSUPPORTED_MEDIA_TYPE, "missing content type".into());
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(err.error.message, "missing content type");
    }
}
