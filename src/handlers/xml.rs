//! Hand-built XML bodies shared by the handlers and the error wrapper.

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

pub fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Wrap an XML body into a response with the right content type.
pub fn xml_response(status: StatusCode, body: String) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml"),
    );
    response
}

pub fn success_body(message: &str) -> String {
    format!(
        "{XML_DECLARATION}<success><message>{}</message></success>",
        xml_escape(message)
    )
}

pub fn error_body(status: StatusCode, message: &str) -> String {
    format!(
        "{XML_DECLARATION}<error><status>{}</status><message>{}</message></error>",
        status.as_u16(),
        xml_escape(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            xml_escape(r#"<a & "b">"#),
            "&lt;a &amp; &quot;b&quot;&gt;"
        );
    }

    #[test]
    fn error_body_carries_status_and_message() {
        let body = error_body(StatusCode::NOT_FOUND, "Bucket not found");
        assert!(body.contains("<status>404</status>"));
        assert!(body.contains("<message>Bucket not found</message>"));
    }
}
