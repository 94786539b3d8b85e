//! Module: value
//! Responsibility: the closed wire-type tag set and the internal document
//! value model shared by the serializer, resolver, and store layers.
//! Does not own: visibility rules or schema constraints.


use crate::document::Document;
use chrono::{DateTime, SecondsFormat, Utc};
use derive_more::Display;
use serde_json::Value as Json;
use ulid::Ulid;

///
/// WireType
///
/// The closed set of JSON wire-type tags. Used uniformly by the validator
/// and by error-message formatting, so both always agree on naming.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum WireType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    #[display("null")]
    Null,
}

impl WireType {
    /// Classify a wire value.
    #[must_use]
    pub const fn of(value: &Json) -> Self {
        match value {
            Json::String(_) => Self::String,
            Json::Number(_) => Self::Number,
            Json::Bool(_) => Self::Boolean,
            Json::Array(_) => Self::Array,
            Json::Object(_) => Self::Object,
            Json::Null => Self::Null,
        }
    }
}

///
/// DocValue
///
/// Internal representation of one slot in a live document tree. The
/// serializer converts between this and the JSON wire format; the store
/// persists whole `Document` trees built from these.
///

#[derive(Clone, Debug, PartialEq)]
pub enum DocValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<Utc>),
    Id(Ulid),
    List(Vec<DocValue>),
    Document(Document),
    /// Untyped passthrough slot; holds the wire value verbatim.
    Dynamic(Json),
}

impl DocValue {
    /// True for the null value only; absent fields are not represented.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Untyped JSON rendering of this value.
    ///
    /// Visibility filtering does not happen here; embedded documents are
    /// emitted with every stored field. The serializer layer is the only
    /// place that applies readonly/writeonly rules.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::Bool(v) => Json::Bool(*v),
            Self::Int(v) => Json::from(*v),
            Self::Float(v) => Json::from(*v),
            Self::Text(v) => Json::String(v.clone()),
            Self::DateTime(v) => {
                Json::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Self::Id(v) => Json::String(v.to_string()),
            Self::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Document(doc) => {
                let mut map = serde_json::Map::new();
                for (name, value) in doc.iter() {
                    map.insert((*name).to_string(), value.to_json());
                }
                Json::Object(map)
            }
            Self::Dynamic(v) => v.clone(),
        }
    }

    /// Borrow the list items, if this value is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[DocValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Mutably borrow the list items, if this value is a list.
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<DocValue>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the embedded document, if this value is one.
    #[must_use]
    pub const fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Mutably borrow the embedded document, if this value is one.
    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }
}
