//! Rendering replies and errors as HTTP responses.

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::Response;
use http_body_util::Full;
use veritas_core::{ApiError, Reply};

/// Header carrying the request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Response type written by the server.
pub type HttpResponse = Response<Full<Bytes>>;

/// Converts a handler reply into a response.
pub fn render_reply(reply: Reply, request_id: &str) -> HttpResponse {
    let status = reply.status();
    let content_type = reply.content_type();
    let mut response = Response::new(Full::new(reply.into_bytes()));
    *response.status_mut() = status;

    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    set_request_id(&mut response, request_id);
    response
}

/// Converts an error into a JSON error envelope.
///
/// `405` responses carry an `Allow` header listing the registered methods.
pub fn render_error(error: &ApiError, request_id: &str) -> HttpResponse {
    let status = error.status_code();
    let envelope = error.to_envelope(Some(request_id));
    let body = match serde_json::to_vec(&envelope) {
        Ok(body) => Bytes::from(body),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize error envelope");
            Bytes::from_static(br#"{"error":{"code":"INTERNAL_ERROR","message":"Internal server error","category":"internal"}}"#)
        }
    };

    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let ApiError::MethodNotAllowed { allowed, .. } = error {
        if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
            response.headers_mut().insert(ALLOW, value);
        }
    }
    set_request_id(&mut response, request_id);
    response
}

fn set_request_id(response: &mut HttpResponse, request_id: &str) {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
}
