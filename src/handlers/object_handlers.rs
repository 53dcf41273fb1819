//! HTTP handlers for object operations. Bodies are buffered whole; the
//! store's gate (index record before payload) decides what a request may
//! touch.

use crate::errors::AppError;
use crate::handlers::xml::{success_body, xml_response};
use crate::services::storage_service::StorageService;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::Response;
use bytes::Bytes;

/// PUT `/{bucket}/{*key}` — upload an object.
pub async fn upload_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    service.put_object(&bucket, &key, content_type, body).await?;

    Ok(xml_response(
        StatusCode::OK,
        success_body(&format!("Object {key} uploaded successfully")),
    ))
}

/// GET `/{bucket}/{*key}` — download an object.
pub async fn get_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let (record, data, content_type) = service.get_object(&bucket, &key).await?;

    let mut response = Response::new(Body::from(data));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&record.size.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    if let Ok(value) = HeaderValue::from_str(&record.last_modified.to_rfc2822()) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    Ok(response)
}

/// DELETE `/{bucket}/{*key}` — delete an object.
pub async fn delete_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    service.delete_object(&bucket, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}
