//! Response builders.
//!
//! Error bodies use the envelope `{"error": {"code": "...", "message": "..."}}`.

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;

/// Type alias for the HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// Builds a plain-text response.
pub fn text(status: StatusCode, body: impl Into<Bytes>) -> HttpResponse {
    with_content_type(status, TEXT_PLAIN, body.into())
}

/// Builds a JSON response from already-encoded bytes.
pub fn json_bytes(status: StatusCode, body: impl Into<Bytes>) -> HttpResponse {
    with_content_type(status, APPLICATION_JSON, body.into())
}

/// Serializes `value` into a JSON response, or a 500 envelope if that fails.
pub fn json<T: Serialize>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => json_bytes(status, body),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response body");
            error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "serialization_error",
                "Failed to serialize response",
            )
        }
    }
}

/// Builds a JSON error envelope.
pub fn error(status: StatusCode, code: &str, message: &str) -> HttpResponse {
    let body = serde_json::json!({
        "error": {
            "code": code,
            "message": message,
        }
    });
    json_bytes(status, body.to_string())
}

/// 404 for a path no route is registered for.
pub fn not_found(path: &str) -> HttpResponse {
    error(
        StatusCode::NOT_FOUND,
        "not_found",
        &format!("No route for path: {path}"),
    )
}

/// 405 listing the methods the path does accept.
pub fn method_not_allowed(method: &Method, allowed: &[Method]) -> HttpResponse {
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let mut response = error(
        StatusCode::METHOD_NOT_ALLOWED,
        "method_not_allowed",
        &format!("Method {method} not allowed, expected {allow}"),
    );
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

fn with_content_type(status: StatusCode, content_type: &'static str, body: Bytes) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(body))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}
