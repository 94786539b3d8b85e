use crate::{
    ser::{
        Serializer,
        error::{SerializeError, SerializeErrorKind},
    },
    value::{DocValue, WireType},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as Json;
use ulid::Ulid;

///
/// FieldKind
///
/// The typed wire-format variants a field can take. `Document` embeds a
/// whole serializer; `List` repeats a sub-field zero or more times.
///

#[derive(Debug)]
pub enum FieldKind {
    Text,
    Int,
    Float,
    Boolean,
    /// ISO 8601 wire format.
    DateTime,
    /// Storage-generated opaque id; always readonly.
    ObjectId,
    /// Serialized as an opaque id string pointing at another document.
    Reference,
    /// Untyped passthrough.
    Dynamic,
    Document(Serializer),
    List(Box<Field>),
}

impl FieldKind {
    /// The wire-type tag a value for this kind must carry.
    ///
    /// `None` means any tag is acceptable (the dynamic passthrough).
    #[must_use]
    pub const fn expected_wire_type(&self) -> Option<WireType> {
        match self {
            Self::Text | Self::DateTime | Self::ObjectId | Self::Reference => {
                Some(WireType::String)
            }
            Self::Int | Self::Float => Some(WireType::Number),
            Self::Boolean => Some(WireType::Boolean),
            Self::Document(_) => Some(WireType::Object),
            Self::List(_) => Some(WireType::Array),
            Self::Dynamic => None,
        }
    }
}

///
/// Field
///
/// One slot in a document shape: a typed wire converter plus the
/// visibility rules enforced at this nesting level. The name is assigned
/// exactly once, at registration into a serializer.
///

#[derive(Debug)]
pub struct Field {
    name: &'static str,
    kind: FieldKind,
    readonly: bool,
    writeonly: bool,
    identifier: bool,
    description: Option<&'static str>,
}

impl Field {
    fn new(kind: FieldKind) -> Self {
        Self {
            name: "",
            kind,
            readonly: false,
            writeonly: false,
            identifier: false,
            description: None,
        }
    }

    #[must_use]
    pub fn text() -> Self {
        Self::new(FieldKind::Text)
    }

    #[must_use]
    pub fn int() -> Self {
        Self::new(FieldKind::Int)
    }

    #[must_use]
    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    #[must_use]
    pub fn datetime() -> Self {
        Self::new(FieldKind::DateTime)
    }

    /// Storage-generated ids can never be written by clients.
    #[must_use]
    pub fn object_id() -> Self {
        Self::new(FieldKind::ObjectId).readonly()
    }

    #[must_use]
    pub fn reference() -> Self {
        Self::new(FieldKind::Reference)
    }

    #[must_use]
    pub fn dynamic() -> Self {
        Self::new(FieldKind::Dynamic)
    }

    #[must_use]
    pub fn document(serializer: Serializer) -> Self {
        Self::new(FieldKind::Document(serializer))
    }

    #[must_use]
    pub fn list(item: Self) -> Self {
        Self::new(FieldKind::List(Box::new(item)))
    }

    #[must_use]
    pub const fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// # Panics
    ///
    /// A writeonly field can never be the identifier; identifiers must be
    /// legible for list matching.
    #[must_use]
    pub fn writeonly(mut self) -> Self {
        assert!(
            !self.identifier,
            "identifier fields cannot be writeonly"
        );
        self.writeonly = true;
        self
    }

    /// Mark this field as the natural key for matching items inside a
    /// list of embedded documents.
    ///
    /// # Panics
    ///
    /// See [`Field::writeonly`]; the combination is rejected either way
    /// round.
    #[must_use]
    pub fn identifier(mut self) -> Self {
        assert!(
            !self.writeonly,
            "identifier fields cannot be writeonly"
        );
        self.identifier = true;
        self
    }

    #[must_use]
    pub const fn description(mut self, text: &'static str) -> Self {
        self.description = Some(text);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn kind(&self) -> &FieldKind {
        &self.kind
    }

    #[must_use]
    pub const fn is_readonly(&self) -> bool {
        self.readonly
    }

    #[must_use]
    pub const fn is_writeonly(&self) -> bool {
        self.writeonly
    }

    #[must_use]
    pub const fn is_identifier(&self) -> bool {
        self.identifier
    }

    #[must_use]
    pub const fn describe(&self) -> Option<&'static str> {
        self.description
    }

    /// The serializer governing this field's embedded document shape, if
    /// it has one: the nested serializer for a document field, or the
    /// element serializer for a list of embedded documents.
    #[must_use]
    pub fn item_serializer(&self) -> Option<&Serializer> {
        match &self.kind {
            FieldKind::Document(sub) => Some(sub),
            FieldKind::List(item) => match item.kind() {
                FieldKind::Document(sub) => Some(sub),
                _ => None,
            },
            _ => None,
        }
    }

    /// The element field of a list.
    #[must_use]
    pub fn item_field(&self) -> Option<&Self> {
        match &self.kind {
            FieldKind::List(item) => Some(item.as_ref()),
            _ => None,
        }
    }

    /// Assign the registration name. Set once by the owning serializer;
    /// list element fields inherit the list's name for error reporting.
    pub(crate) fn assign_name(&mut self, name: &'static str) {
        debug_assert!(self.name.is_empty(), "field name assigned twice");
        self.name = name;
        if let FieldKind::List(item) = &mut self.kind {
            item.assign_name(name);
        }
    }

    // ------------------------------------------------------------------
    // Wire conversion
    // ------------------------------------------------------------------

    /// Convert an internal value to its wire form.
    ///
    /// The writeonly check is defensive: the serializer skips writeonly
    /// fields before ever reaching here, so tripping it means the owning
    /// serializer was constructed wrong.
    pub fn serialize(&self, value: &DocValue) -> Result<Json, SerializeError> {
        if self.writeonly && !value.is_null() {
            return Err(SerializeErrorKind::SerializeWriteonlyField { field: self.name }.into());
        }
        if value.is_null() {
            return Ok(Json::Null);
        }

        match &self.kind {
            FieldKind::Document(sub) => match value {
                DocValue::Document(doc) => {
                    sub.serialize(doc).map_err(|err| err.with_parent(self.name))
                }
                other => Ok(other.to_json()),
            },
            FieldKind::List(item) => match value {
                DocValue::List(items) => {
                    // The item field shares this field's name and pushes
                    // the parent chain itself.
                    let mut out = Vec::with_capacity(items.len());
                    for element in items {
                        out.push(item.serialize(element)?);
                    }
                    Ok(Json::Array(out))
                }
                other => Ok(other.to_json()),
            },
            _ => Ok(value.to_json()),
        }
    }

    /// Convert a wire value to its internal form.
    ///
    /// `null` passes through unchanged. `allow_readonly` has no effect at
    /// the field level (readonly keys are dropped by the serializer); it
    /// is forwarded so embedded documents apply the same policy at every
    /// depth. Null elements inside a list are dropped, not errors.
    pub fn deserialize(&self, wire: &Json, allow_readonly: bool) -> Result<DocValue, SerializeError> {
        if wire.is_null() {
            return Ok(DocValue::Null);
        }

        if let Some(expected) = self.kind.expected_wire_type() {
            let actual = WireType::of(wire);
            if actual != expected {
                return Err(SerializeErrorKind::ValueInvalidType {
                    field: self.name,
                    expected,
                    actual,
                }
                .into());
            }
        }

        match &self.kind {
            FieldKind::Text => Ok(DocValue::Text(as_str(wire).to_string())),
            FieldKind::Int => wire.as_i64().map(DocValue::Int).ok_or_else(|| {
                SerializeErrorKind::ValueInvalidFormat {
                    field: self.name,
                    format: "integer",
                    value: wire.to_string(),
                }
                .into()
            }),
            FieldKind::Float => wire.as_f64().map(DocValue::Float).ok_or_else(|| {
                SerializeErrorKind::ValueInvalidFormat {
                    field: self.name,
                    format: "number",
                    value: wire.to_string(),
                }
                .into()
            }),
            FieldKind::Boolean => Ok(DocValue::Bool(wire.as_bool().unwrap_or_default())),
            FieldKind::DateTime => self.parse_datetime(as_str(wire)),
            FieldKind::ObjectId | FieldKind::Reference => self.parse_id(as_str(wire)),
            FieldKind::Dynamic => Ok(DocValue::Dynamic(wire.clone())),
            FieldKind::Document(sub) => sub
                .deserialize(wire, allow_readonly)
                .map(DocValue::Document)
                .map_err(|err| err.with_parent(self.name)),
            FieldKind::List(item) => {
                let elements = wire
                    .as_array()
                    .map_or(&[][..], Vec::as_slice);
                let mut out = Vec::with_capacity(elements.len());
                for element in elements {
                    // Dropping nulls here is long-standing behavior that
                    // clients depend on.
                    if element.is_null() {
                        continue;
                    }
                    out.push(item.deserialize(element, allow_readonly)?);
                }
                Ok(DocValue::List(out))
            }
        }
    }

    /// Parse a URL-sourced text value (path identifier or query filter)
    /// through this field's type.
    pub fn deserialize_text(&self, raw: &str) -> Result<DocValue, SerializeError> {
        match &self.kind {
            FieldKind::Text => Ok(DocValue::Text(raw.to_string())),
            FieldKind::Int => raw.parse().map(DocValue::Int).map_err(|_| {
                self.format_error("integer", raw)
            }),
            FieldKind::Float => raw.parse().map(DocValue::Float).map_err(|_| {
                self.format_error("number", raw)
            }),
            FieldKind::Boolean => match raw {
                "true" | "1" => Ok(DocValue::Bool(true)),
                "false" | "0" => Ok(DocValue::Bool(false)),
                _ => Err(self.format_error("boolean", raw)),
            },
            FieldKind::DateTime => self.parse_datetime(raw),
            FieldKind::ObjectId | FieldKind::Reference => self.parse_id(raw),
            FieldKind::Dynamic => Ok(DocValue::Text(raw.to_string())),
            FieldKind::Document(_) | FieldKind::List(_) => {
                Err(self.format_error("scalar", raw))
            }
        }
    }

    fn parse_datetime(&self, raw: &str) -> Result<DocValue, SerializeError> {
        // RFC 3339 first; fall back to a bare ISO 8601 local form, which
        // is read as UTC.
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc())
            })
            .map(DocValue::DateTime)
            .map_err(|_| self.format_error("ISO 8601", raw))
    }

    fn parse_id(&self, raw: &str) -> Result<DocValue, SerializeError> {
        Ulid::from_string(raw)
            .map(DocValue::Id)
            .map_err(|_| self.format_error("ULID", raw))
    }

    fn format_error(&self, format: &'static str, raw: &str) -> SerializeError {
        SerializeErrorKind::ValueInvalidFormat {
            field: self.name,
            format,
            value: raw.to_string(),
        }
        .into()
    }
}

/// Borrow the string content of a type-checked wire value.
fn as_str(wire: &Json) -> &str {
    wire.as_str().unwrap_or_default()
}
