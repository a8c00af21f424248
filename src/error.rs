//! Structured error types for API responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

use crate::db::users::EmailTaken;
use crate::store::StoreError;
use crate::types::FieldError;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidBody,

    // Auth errors
    Unauthorized,
    InvalidCredentials,
    CsrfMismatch,

    // Not found errors
    ClientNotFound,
    TaskNotFound,
    UploadNotFound,
    RouteNotFound,

    // Request shape errors
    MethodNotAllowed,
    AlreadyExists,
    PayloadTooLarge,

    // Internal errors
    DatabaseError,
    StorageError,
    InternalError,
}

impl ErrorCode {
    /// HTTP status this code is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::InvalidBody => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized | ErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ErrorCode::CsrfMismatch => StatusCode::FORBIDDEN,
            ErrorCode::ClientNotFound
            | ErrorCode::TaskNotFound
            | ErrorCode::UploadNotFound
            | ErrorCode::RouteNotFound => StatusCode::NOT_FOUND,
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::AlreadyExists => StatusCode::CONFLICT,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::DatabaseError | ErrorCode::StorageError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Structured error for API responses.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn invalid_body(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidBody, reason)
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, reason)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials, "Invalid email or password")
    }

    pub fn csrf_mismatch() -> Self {
        Self::new(ErrorCode::CsrfMismatch, "Missing or mismatched CSRF token")
    }

    pub fn client_not_found(client_id: &str) -> Self {
        Self::new(
            ErrorCode::ClientNotFound,
            format!("Client not found: {}", client_id),
        )
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn upload_not_found(upload_id: &str) -> Self {
        Self::new(
            ErrorCode::UploadNotFound,
            format!("Upload not found: {}", upload_id),
        )
    }

    pub fn route_not_found(path: &str) -> Self {
        Self::new(ErrorCode::RouteNotFound, format!("No route for {}", path))
    }

    pub fn method_not_allowed(method: &str, path: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotAllowed,
            format!("Method {} not allowed on {}", method, path),
        )
    }

    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyExists, what)
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            ErrorCode::PayloadTooLarge,
            format!("Request body exceeds {} bytes", limit),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn storage(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::StorageError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = ?self.code, message = %self.message, "Request failed");
        } else {
            tracing::debug!(code = ?self.code, message = %self.message, "Request rejected");
        }
        (status, Json(self)).into_response()
    }
}

impl From<FieldError> for ApiError {
    fn from(err: FieldError) -> Self {
        if err.missing {
            ApiError::new(ErrorCode::MissingRequiredField, err.message).with_field(err.field)
        } else {
            ApiError::invalid_value(&err.field, &err.message)
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ClientNotFound(id) => ApiError::client_not_found(&id),
            StoreError::UploadNotFound(id) => ApiError::upload_not_found(&id),
            StoreError::Validation(field_err) => field_err.into(),
            StoreError::Backend(e) => ApiError::database(e),
            other => ApiError::storage(other),
        }
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Typed errors raised below the HTTP layer keep their meaning
        let err = match err.downcast::<ApiError>() {
            Ok(api_err) => return api_err,
            Err(err) => err,
        };
        let err = match err.downcast::<FieldError>() {
            Ok(field_err) => return field_err.into(),
            Err(err) => err,
        };
        match err.downcast::<EmailTaken>() {
            Ok(taken) => ApiError::already_exists(taken.to_string()).with_field("email"),
            Err(err) => ApiError::internal(err),
        }
    }
}

/// Result type for request handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
