use crate::{
    document::Document,
    ser::{
        error::{SerializeError, SerializeErrorKind},
        field::Field,
    },
    value::WireType,
};
use serde_json::Value as Json;
use std::{collections::HashMap, sync::OnceLock};

///
/// Serializer
///
/// A named, ordered collection of fields bound to one document shape.
/// Field order is first-class: it is the declaration order, and it is the
/// order keys appear in serialized output.
///

#[derive(Debug)]
pub struct Serializer {
    name: &'static str,
    description: Option<&'static str>,
    fields: Vec<Field>,
    index: OnceLock<HashMap<&'static str, usize>>,
}

impl Serializer {
    #[must_use]
    pub const fn builder(name: &'static str) -> SerializerBuilder {
        SerializerBuilder {
            name,
            description: None,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn describe(&self) -> Option<&'static str> {
        self.description
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Case-sensitive field lookup; memoized after first use.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        let index = self.index.get_or_init(|| {
            self.fields
                .iter()
                .enumerate()
                .map(|(position, field)| (field.name(), position))
                .collect()
        });

        index.get(name).map(|position| &self.fields[*position])
    }

    /// Field lookup that reports unregistered names as errors.
    pub fn field(&self, name: &str) -> Result<&Field, SerializeError> {
        self.get(name).ok_or_else(|| {
            SerializeErrorKind::UnknownField {
                fieldname: name.to_string(),
            }
            .into()
        })
    }

    /// The declared identifier field, if any. The builder guarantees at
    /// most one.
    #[must_use]
    pub fn identifier(&self) -> Option<&Field> {
        self.fields.iter().find(|field| field.is_identifier())
    }

    /// Serialize a document into an ordered wire object.
    ///
    /// Writeonly fields are omitted entirely, not emitted as null. Fields
    /// absent from the document serialize as null.
    pub fn serialize(&self, doc: &Document) -> Result<Json, SerializeError> {
        let mut out = serde_json::Map::with_capacity(self.fields.len());

        for field in &self.fields {
            if field.is_writeonly() {
                continue;
            }
            let value = doc.get(field.name());
            let wire = match value {
                Some(value) => field.serialize(value)?,
                None => Json::Null,
            };
            out.insert(field.name().to_string(), wire);
        }

        Ok(Json::Object(out))
    }

    /// Deserialize a wire object into a sparse document.
    ///
    /// Keys for readonly fields are silently dropped unless
    /// `allow_readonly` is set; that mode exists so item updates can keep
    /// an identifier's value for matching. Unknown keys are errors.
    pub fn deserialize(&self, wire: &Json, allow_readonly: bool) -> Result<Document, SerializeError> {
        let Json::Object(entries) = wire else {
            return Err(SerializeErrorKind::DataInvalidType {
                serializer: self.name,
                actual: WireType::of(wire),
            }
            .into());
        };

        let mut doc = Document::new();
        for (key, value) in entries {
            let field = self.field(key)?;

            if field.is_readonly() && !allow_readonly {
                continue;
            }
            doc.set(field.name(), field.deserialize(value, allow_readonly)?);
        }

        Ok(doc)
    }
}

///
/// SerializerBuilder
///
/// Explicit, ordered field registration. Registration assigns each
/// field's immutable name; definition mistakes (duplicate names, two
/// identifiers) are process-start panics, not runtime errors.
///

#[derive(Debug)]
pub struct SerializerBuilder {
    name: &'static str,
    description: Option<&'static str>,
    fields: Vec<Field>,
}

impl SerializerBuilder {
    #[must_use]
    pub const fn description(mut self, text: &'static str) -> Self {
        self.description = Some(text);
        self
    }

    /// Register a field under `name`, in declaration order.
    ///
    /// # Panics
    ///
    /// On a duplicate field name, or on a second identifier field.
    #[must_use]
    pub fn field(mut self, name: &'static str, mut field: Field) -> Self {
        assert!(
            !self.fields.iter().any(|existing| existing.name() == name),
            "duplicate field '{name}' on serializer '{}'",
            self.name
        );
        assert!(
            !(field.is_identifier() && self.fields.iter().any(Field::is_identifier)),
            "serializer '{}' declares more than one identifier field",
            self.name
        );

        field.assign_name(name);
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn build(self) -> Serializer {
        Serializer {
            name: self.name,
            description: self.description,
            fields: self.fields,
            index: OnceLock::new(),
        }
    }
}
