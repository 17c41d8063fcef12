//! API error type and its HTTP response mapping

use axum::{
    extract::rejection::JsonRejection,
    http::{header::ALLOW, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use cardvault_core::domain::CARD_REQUIRED_FIELDS;
use cardvault_core::{Error, ErrorBody};

/// Error response with the API's JSON error shape
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, body: ErrorBody) -> Self {
        Self { status, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::MissingFields(missing) => Self::new(
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Missing required fields".to_string(),
                    message: None,
                    required: Some(CARD_REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect()),
                    missing: Some(missing),
                },
            ),
            Error::Validation(message) => Self::new(StatusCode::BAD_REQUEST, ErrorBody::new(message)),
            Error::NotFound(message) => Self::new(StatusCode::NOT_FOUND, ErrorBody::new(message)),
            Error::Conflict(message) => Self::new(StatusCode::CONFLICT, ErrorBody::new(message)),
            other => {
                tracing::error!(error = %other, "Request failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("Internal Server Error").with_message(other.to_string()),
                )
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorBody::new("Invalid JSON body").with_message(rejection.body_text()),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// 405 response listing the methods a path supports
pub fn method_not_allowed(method: &Method, allowed: &[Method]) -> Response {
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let body = ErrorBody::new(format!("Method {} Not Allowed", method));

    let mut response = (StatusCode::METHOD_NOT_ALLOWED, Json(body)).into_response();
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}
