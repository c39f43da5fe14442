//! Handler return values.
//!
//! Handlers may return anything implementing [`IntoReply`]: plain strings,
//! JSON values, `Json<T>` for serializable types, a `(StatusCode, _)` pair,
//! or a ready-made [`Reply`].

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// The body of a [`Reply`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    /// No content.
    Empty,
    /// `text/plain` content.
    Text(String),
    /// `application/json` content.
    Json(Value),
}

/// A handler's response before it is written to the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    status: StatusCode,
    body: ReplyBody,
}

impl Reply {
    /// A `200 OK` text reply.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: ReplyBody::Text(text.into()),
        }
    }

    /// A `200 OK` JSON reply.
    #[must_use]
    pub const fn json(value: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: ReplyBody::Json(value),
        }
    }

    /// A `204 No Content` reply.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: ReplyBody::Empty,
        }
    }

    /// Overrides the status code.
    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns the status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the body.
    #[must_use]
    pub const fn body(&self) -> &ReplyBody {
        &self.body
    }

    /// Returns the `content-type` for the body, if any.
    #[must_use]
    pub const fn content_type(&self) -> Option<&'static str> {
        match self.body {
            ReplyBody::Empty => None,
            ReplyBody::Text(_) => Some("text/plain; charset=utf-8"),
            ReplyBody::Json(_) => Some("application/json"),
        }
    }

    /// Encodes the body.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self.body {
            ReplyBody::Empty => Bytes::new(),
            ReplyBody::Text(text) => Bytes::from(text),
            ReplyBody::Json(value) => Bytes::from(value.to_string()),
        }
    }
}

/// Wraps a serializable value as a JSON reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

/// Conversion into a [`Reply`].
pub trait IntoReply {
    /// Performs the conversion.
    fn into_reply(self) -> ApiResult<Reply>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> ApiResult<Reply> {
        Ok(self)
    }
}

impl IntoReply for () {
    fn into_reply(self) -> ApiResult<Reply> {
        Ok(Reply::empty())
    }
}

impl IntoReply for String {
    fn into_reply(self) -> ApiResult<Reply> {
        Ok(Reply::text(self))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> ApiResult<Reply> {
        Ok(Reply::text(self))
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> ApiResult<Reply> {
        Ok(Reply::json(self))
    }
}

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> ApiResult<Reply> {
        serde_json::to_value(self.0)
            .map(Reply::json)
            .map_err(|e| ApiError::internal_with_source("failed to serialize response", e))
    }
}

impl<R: IntoReply> IntoReply for (StatusCode, R) {
    fn into_reply(self) -> ApiResult<Reply> {
        self.1.into_reply().map(|reply| reply.with_status(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Greeting {
        message: &'static str,
    }

    #[test]
    fn test_text_reply() {
        let reply = "Veritas".into_reply().unwrap();
        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(reply.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(reply.into_bytes(), Bytes::from_static(b"Veritas"));
    }

    #[test]
    fn test_json_reply() {
        let reply = Json(Greeting { message: "hi" }).into_reply().unwrap();
        assert_eq!(reply.body(), &ReplyBody::Json(json!({"message": "hi"})));
        assert_eq!(reply.content_type(), Some("application/json"));
    }

    #[test]
    fn test_empty_reply() {
        let reply = ().into_reply().unwrap();
        assert_eq!(reply.status(), StatusCode::NO_CONTENT);
        assert!(reply.content_type().is_none());
        assert!(reply.into_bytes().is_empty());
    }

    #[test]
    fn test_status_override() {
        let reply = (StatusCode::CREATED, json!({"id": 1})).into_reply().unwrap();
        assert_eq!(reply.status(), StatusCode::CREATED);
        assert_eq!(reply.into_bytes(), Bytes::from(r#"{"id":1}"#));
    }
}
