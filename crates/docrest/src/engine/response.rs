use crate::{resolve::ResolveError, ser::SerializeError};
use serde::Serialize;
use serde_json::Value as Json;
use tracing::warn;

///
/// Response
///
/// The status / JSON body / headers triple handed back to the transport.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Response {
    pub status: u16,
    pub body: Json,
    pub headers: Vec<(&'static str, String)>,
}

impl Response {
    #[must_use]
    pub const fn json(status: u16, body: Json) -> Self {
        Self {
            status,
            body,
            headers: Vec::new(),
        }
    }

    /// Successful delete: empty body.
    #[must_use]
    pub const fn no_content() -> Self {
        Self::json(204, Json::Null)
    }

    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: String) -> Self {
        self.headers.push((name, value));
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

///
/// EngineError
///
/// The single currency every dispatch step fails with: an HTTP status, a
/// human message, and optionally a per-field error map. Converted to a
/// JSON response at the engine boundary and nowhere else.
///

#[derive(Clone, Debug, PartialEq)]
pub struct EngineError {
    pub status: u16,
    pub message: String,
    pub errors: Vec<(String, String)>,
}

impl EngineError {
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_errors(status: u16, message: impl Into<String>, errors: Vec<(String, String)>) -> Self {
        Self {
            status,
            message: message.into(),
            errors,
        }
    }

    /// A condition clients cannot act on; the detail stays in the logs.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(500, "An internal server error occurred.")
    }

    /// Default denial used by authenticators.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(401, "Not authorized.")
    }

    /// Render as `{"message": ...}`, with an `"errors"` object when
    /// per-field details exist.
    #[must_use]
    pub fn into_response(self) -> Response {
        let mut map = serde_json::Map::new();
        map.insert("message".to_string(), Json::String(self.message));

        if !self.errors.is_empty() {
            let mut fields = serde_json::Map::new();
            for (path, detail) in self.errors {
                fields.insert(path, Json::String(detail));
            }
            map.insert("errors".to_string(), Json::Object(fields));
        }

        Response::json(self.status, Json::Object(map))
    }
}

impl From<SerializeError> for EngineError {
    fn from(err: SerializeError) -> Self {
        if err.is_internal() {
            warn!(%err, "serializer misconfiguration");
            Self::internal()
        } else {
            Self::new(400, err.to_string())
        }
    }
}

impl From<ResolveError> for EngineError {
    fn from(err: ResolveError) -> Self {
        let status = match err {
            ResolveError::NotFound { .. } => 404,
            ResolveError::BadIdentifier { .. } => 400,
        };
        Self::new(status, err.to_string())
    }
}
