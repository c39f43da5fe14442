//! Raw request decoding.
//!
//! Transports use these helpers to turn a query string and a body into the
//! raw JSON values a [`RequestContext`](veritas_core::RequestContext) carries.
//! Nothing here validates; that is left to the route's schemas.

use serde_json::{Map, Value};
use veritas_core::{ApiError, ApiResult};

/// Default maximum body size (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Decodes a URL query string into an object of strings.
///
/// A key that appears more than once becomes an array of its values in
/// order of appearance.
///
/// ```
/// use serde_json::json;
/// use veritas::decode::decode_query;
///
/// assert_eq!(
///     decode_query(Some("test=hello&tag=a&tag=b")).unwrap(),
///     json!({"test": "hello", "tag": ["a", "b"]})
/// );
/// assert_eq!(decode_query(None).unwrap(), json!({}));
/// ```
pub fn decode_query(query: Option<&str>) -> ApiResult<Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| ApiError::bad_request(format!("invalid query string: {e}")))?;
    Ok(Value::Object(collect_pairs(pairs)))
}

fn collect_pairs(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match out.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                out.insert(key, value);
            }
        }
    }
    out
}

/// Decodes a request body according to its content type.
///
/// - empty body: `null`
/// - `application/json` and `*+json`: parsed JSON
/// - `application/x-www-form-urlencoded`: object of strings, like a query
/// - `text/*` or no content type: the body as a string
///
/// Other media types are rejected.
pub fn decode_body(content_type: Option<&str>, body: &[u8]) -> ApiResult<Value> {
    decode_body_with_limit(content_type, body, DEFAULT_MAX_BODY_SIZE)
}

/// Like [`decode_body`] with an explicit size limit.
pub fn decode_body_with_limit(
    content_type: Option<&str>,
    body: &[u8],
    limit: usize,
) -> ApiResult<Value> {
    if body.len() > limit {
        return Err(ApiError::bad_request(format!(
            "request body of {} bytes exceeds the {limit} byte limit",
            body.len()
        )));
    }
    if body.is_empty() {
        return Ok(Value::Null);
    }

    let mime = match content_type {
        Some(raw) => Some(
            raw.parse::<mime::Mime>()
                .map_err(|e| ApiError::bad_request(format!("invalid content type '{raw}': {e}")))?,
        ),
        None => None,
    };

    match mime {
        Some(m) if is_json(&m) => serde_json::from_slice(body)
            .map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}"))),
        Some(m) if m.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() => {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
                .map_err(|e| ApiError::bad_request(format!("invalid form body: {e}")))?;
            Ok(Value::Object(collect_pairs(pairs)))
        }
        Some(m) if m.type_() != mime::TEXT => Err(ApiError::bad_request(format!(
            "unsupported content type '{m}'"
        ))),
        _ => std::str::from_utf8(body)
            .map(|text| Value::String(text.to_string()))
            .map_err(|_| ApiError::bad_request("text body is not valid UTF-8")),
    }
}

fn is_json(m: &mime::Mime) -> bool {
    m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_percent_decoding() {
        assert_eq!(
            decode_query(Some("q=rust+lang&name=caf%C3%A9")).unwrap(),
            json!({"q": "rust lang", "name": "café"})
        );
    }

    #[test]
    fn test_query_three_repeats() {
        assert_eq!(
            decode_query(Some("x=1&x=2&x=3")).unwrap(),
            json!({"x": ["1", "2", "3"]})
        );
    }

    #[test]
    fn test_empty_body_is_null() {
        assert_eq!(decode_body(Some("application/json"), b"").unwrap(), Value::Null);
    }

    #[test]
    fn test_json_body() {
        let value = decode_body(Some("application/json; charset=utf-8"), br#"{"test":"hi"}"#)
            .unwrap();
        assert_eq!(value, json!({"test": "hi"}));

        let value = decode_body(Some("application/vnd.api+json"), b"[1,2]").unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn test_malformed_json_is_bad_request() {
        let err = decode_body(Some("application/json"), b"{").unwrap_err();
        assert_eq!(err.status_code().as_u16(), 400);
    }

    #[test]
    fn test_form_body() {
        let value = decode_body(
            Some("application/x-www-form-urlencoded"),
            b"username=alice&role=a&role=b",
        )
        .unwrap();
        assert_eq!(value, json!({"username": "alice", "role": ["a", "b"]}));
    }

    #[test]
    fn test_text_body() {
        assert_eq!(
            decode_body(Some("text/plain"), b"hello").unwrap(),
            json!("hello")
        );
        assert_eq!(decode_body(None, b"hello").unwrap(), json!("hello"));
    }

    #[test]
    fn test_unsupported_and_oversized() {
        assert!(decode_body(Some("image/png"), b"\x89PNG").is_err());
        assert!(decode_body_with_limit(None, b"0123456789", 4).is_err());
    }
}
