//! Defines routes for all S3-like bucket and object operations.
//!
//! ## Structure
//! - **Service-level endpoints**
//!   - `GET    /` — list all buckets
//!
//! - **Bucket-level endpoints**
//!   - `PUT    /{bucket}` — create bucket
//!   - `DELETE /{bucket}` — delete bucket (only when empty)
//!
//! - **Object-level endpoints**
//!   - `PUT    /{bucket}/{*key}` — upload object
//!   - `GET    /{bucket}/{*key}` — download object
//!   - `DELETE /{bucket}/{*key}` — delete object
//!
//! The wildcard `*key` allows nested keys like `photos/2025/img.jpg`.

use crate::{
    handlers::{
        bucket_handlers::{create_bucket, delete_bucket, list_buckets},
        health_handlers::{healthz, readyz},
        object_handlers::{delete_object, get_object, upload_object},
    },
    services::storage_service::StorageService,
};
use axum::{
    Router,
    routing::{get, put},
};

/// Build and return the router for all S3-compatible routes.
///
/// This function composes service-, bucket- and object-level routes in one
/// `Router<StorageService>`. The router carries shared state
/// (`StorageService`) to all handlers.
pub fn routes() -> Router<StorageService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Service-level routes
        .route("/", get(list_buckets))
        // Object-level routes
        .route(
            "/{bucket}/{*key}",
            put(upload_object).get(get_object).delete(delete_object),
        )
        // Bucket-level routes
        .route("/{bucket}", put(create_bucket).delete(delete_bucket))
}
