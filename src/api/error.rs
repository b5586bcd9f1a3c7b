//! API error types with structured JSON responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::booking::BookingError;
use crate::core_state::CoreError;
use crate::db::DatabaseError;
use crate::directory::DirectoryError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Slot conflict: {0}")]
    SlotConflict(String),
    #[error("Email already registered: {0}")]
    EmailTaken(String),
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("Invalid target: {0}")]
    InvalidTarget(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, "FORBIDDEN", detail),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::SlotConflict(detail) => (StatusCode::CONFLICT, "SLOT_CONFLICT", detail),
            ApiError::EmailTaken(email) => (
                StatusCode::CONFLICT,
                "EMAIL_TAKEN",
                format!("An account with email {email} already exists"),
            ),
            ApiError::InvalidStatus(detail) => {
                (StatusCode::BAD_REQUEST, "INVALID_STATUS", detail)
            }
            ApiError::InvalidTarget(detail) => {
                (StatusCode::BAD_REQUEST, "INVALID_TARGET", detail)
            }
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            BookingError::Forbidden(detail) => ApiError::Forbidden(detail),
            BookingError::SlotConflict { .. } => ApiError::SlotConflict(err.to_string()),
            BookingError::InvalidStatus(value) => {
                ApiError::InvalidStatus(format!("Unknown appointment status: {value}"))
            }
            BookingError::InvalidTarget(detail) => ApiError::InvalidTarget(detail),
            BookingError::Database(e) => e.into(),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DirectoryError::NotADoctor(_) => ApiError::InvalidTarget(err.to_string()),
            DirectoryError::DuplicateEmail(email) => ApiError::EmailTaken(email),
            DirectoryError::TokenInUse => ApiError::Internal(err.to_string()),
            DirectoryError::Database(e) => e.into(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Directory(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use chrono::NaiveDate;
    use uuid::Uuid;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_returns_401() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn slot_conflict_returns_409_with_actionable_message() {
        let err: ApiError = BookingError::SlotConflict {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            time: "10:00".into(),
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "SLOT_CONFLICT");
        let message = json["error"]["message"].as_str().unwrap();
        assert!(message.contains("2024-06-01 10:00"));
        assert!(message.contains("choose another"));
    }

    #[tokio::test]
    async fn booking_errors_map_to_statuses() {
        let cases: Vec<(BookingError, StatusCode, &str)> = vec![
            (
                BookingError::NotFound { entity: "Appointment", id: Uuid::nil() },
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (BookingError::Forbidden("no".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (
                BookingError::InvalidStatus("archived".into()),
                StatusCode::BAD_REQUEST,
                "INVALID_STATUS",
            ),
            (
                BookingError::InvalidTarget("not approved".into()),
                StatusCode::BAD_REQUEST,
                "INVALID_TARGET",
            ),
        ];
        for (err, status, code) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
            assert_eq!(body_json(response).await["error"]["code"], code);
        }
    }

    #[tokio::test]
    async fn directory_errors_map_to_statuses() {
        let response = ApiError::from(DirectoryError::NotADoctor(Uuid::nil())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_TARGET");

        let response =
            ApiError::from(DirectoryError::DuplicateEmail("a@b.c".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["error"]["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn internal_returns_500() {
        let response = ApiError::from(DatabaseError::LockPoisoned).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        // Internal errors hide details from client
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn bad_request_returns_400() {
        let response = ApiError::BadRequest("Invalid ID format".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
    }
}
