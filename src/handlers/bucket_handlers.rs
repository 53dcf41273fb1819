//! HTTP handlers for bucket-level operations. Thin glue: validation and
//! state changes live in `StorageService`, these functions serialize the
//! results as XML.

use crate::errors::AppError;
use crate::handlers::xml::{XML_DECLARATION, success_body, xml_escape, xml_response};
use crate::models::bucket::{Bucket, format_timestamp};
use crate::services::storage_service::StorageService;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;

/// GET `/` — list all buckets in catalog order.
pub async fn list_buckets(State(service): State<StorageService>) -> Result<Response, AppError> {
    let buckets = service.list_buckets().await?;
    Ok(xml_response(StatusCode::OK, list_buckets_xml(&buckets)))
}

/// PUT `/{bucket}` — create a bucket.
pub async fn create_bucket(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<Response, AppError> {
    service.create_bucket(&bucket).await?;
    Ok(xml_response(
        StatusCode::OK,
        success_body(&format!("Bucket {bucket} created successfully")),
    ))
}

/// DELETE `/{bucket}` — delete an empty bucket.
pub async fn delete_bucket(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<StatusCode, AppError> {
    service.delete_bucket(&bucket).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn list_buckets_xml(buckets: &[Bucket]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str("<ListAllMyBucketsResult><Buckets>");
    for bucket in buckets {
        xml.push_str("<Bucket>");
        xml.push_str(&format!("<Name>{}</Name>", xml_escape(&bucket.name)));
        xml.push_str(&format!(
            "<CreationDate>{}</CreationDate>",
            format_timestamp(bucket.creation_date)
        ));
        xml.push_str(&format!(
            "<ContentStatus>{}</ContentStatus>",
            bucket.status.as_str()
        ));
        xml.push_str(&format!(
            "<LastModified>{}</LastModified>",
            format_timestamp(bucket.last_modified)
        ));
        xml.push_str("</Bucket>");
    }
    xml.push_str("</Buckets></ListAllMyBucketsResult>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bucket::{BucketStatus, parse_timestamp};

    #[test]
    fn list_xml_contains_all_fields_in_order() {
        let buckets = vec![Bucket {
            name: "my-bucket".into(),
            creation_date: parse_timestamp("2024-05-01T10:00:00Z").unwrap(),
            status: BucketStatus::Active,
            last_modified: parse_timestamp("2024-05-02T10:00:00Z").unwrap(),
        }];
        let xml = list_buckets_xml(&buckets);
        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains(
            "<Bucket><Name>my-bucket</Name>\
             <CreationDate>2024-05-01T10:00:00Z</CreationDate>\
             <ContentStatus>active</ContentStatus>\
             <LastModified>2024-05-02T10:00:00Z</LastModified></Bucket>"
        ));
    }

    #[test]
    fn empty_catalog_still_produces_well_formed_list() {
        let xml = list_buckets_xml(&[]);
        assert!(xml.contains("<Buckets></Buckets>"));
    }
}
