use crate::engine::EngineError;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Media type accepted for request bodies.
pub const ACCEPTED_MEDIA_TYPE: &str = "application/json";

///
/// Method
///
/// The verbs the engine dispatches on. Anything else is rejected at parse
/// time with a 405.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum Method {
    #[display("GET")]
    Get,
    #[display("POST")]
    Post,
    #[display("PUT")]
    Put,
    #[display("DELETE")]
    Delete,
}

impl Method {
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(EngineError::new(
                405,
                format!("The method '{raw}' is not supported."),
            )),
        }
    }
}

///
/// Request
///
/// What the transport layer must deliver: verb, path below the resource
/// root, decoded query pairs, and the raw body with its content type.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub body: Option<String>,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: Vec::new(),
            content_type: None,
            body: None,
        }
    }

    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    #[must_use]
    pub fn post(path: &str) -> Self {
        Self::new(Method::Post, path)
    }

    #[must_use]
    pub fn put(path: &str) -> Self {
        Self::new(Method::Put, path)
    }

    #[must_use]
    pub fn delete(path: &str) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Append one decoded query pair.
    #[must_use]
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach a JSON body with the accepted content type.
    #[must_use]
    pub fn json(mut self, body: &Json) -> Self {
        self.content_type = Some(ACCEPTED_MEDIA_TYPE.to_string());
        self.body = Some(body.to_string());
        self
    }

    /// Attach a raw body without touching the content type.
    #[must_use]
    pub fn raw_body(mut self, raw: &str) -> Self {
        self.body = Some(raw.to_string());
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, value: &str) -> Self {
        self.content_type = Some(value.to_string());
        self
    }
}
