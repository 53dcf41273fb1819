//! HTTP-facing error wrapper. Every store failure maps to one status
//! category and an XML `<error>` body; internal causes are logged, not
//! leaked to the client.

use crate::handlers::xml::{error_body, xml_response};
use crate::store::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

/// A lightweight wrapper for request errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        xml_response(self.status, error_body(self.status, &self.message))
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let status = match &err {
            StorageError::InvalidBucketName { .. } | StorageError::InvalidObjectKey => {
                StatusCode::BAD_REQUEST
            }
            StorageError::BucketNotFound(_) | StorageError::ObjectNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            StorageError::BucketAlreadyExists(_) | StorageError::BucketNotEmpty(_) => {
                StatusCode::CONFLICT
            }
            StorageError::CorruptStore { .. } | StorageError::Io(_) => {
                tracing::error!(error = %err, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError::new(status, err.to_string())
    }
}
