use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Errors surfaced to API clients.
///
/// `NotFoundOrExpired` deliberately keeps one generic message so callers
/// cannot probe which email addresses have a pending code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("OTP not found or expired")]
    NotFoundOrExpired,
    #[error("Invalid OTP type")]
    WrongPurpose,
    #[error("Too many failed attempts")]
    TooManyAttempts,
    #[error("Invalid OTP")]
    InvalidCode { attempts_left: u32 },
    #[error("{0}")]
    Delivery(&'static str),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(rename = "attemptsLeft", skip_serializing_if = "Option::is_none")]
    attempts_left: Option<u32>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        let attempts_left = match &self {
            ApiError::InvalidCode { attempts_left } => Some(*attempts_left),
            _ => None,
        };
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            attempts_left,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Validation("Email is required")
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFoundOrExpired.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Delivery("Failed to send OTP")
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ApiError::NotFoundOrExpired.to_string(),
            "OTP not found or expired"
        );
        assert_eq!(ApiError::WrongPurpose.to_string(), "Invalid OTP type");
        assert_eq!(
            ApiError::TooManyAttempts.to_string(),
            "Too many failed attempts"
        );
        assert_eq!(
            ApiError::InvalidCode { attempts_left: 2 }.to_string(),
            "Invalid OTP"
        );
    }
}
