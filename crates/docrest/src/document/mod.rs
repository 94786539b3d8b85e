//! Module: document
//! Responsibility: the ordered live document tree and the storage schema
//! (defaults, uniqueness, validation constraints) the store enforces on save.
//! Does not own: wire conversion or visibility rules; those live in `ser`.


use crate::value::DocValue;
use chrono::Utc;
use ulid::Ulid;

/// Field name reserved for the storage identifier on root documents.
pub const ID_FIELD: &str = "id";

///
/// Document
///
/// An ordered field-name → value map. Field names come from serializer
/// registration and are static; insertion order is preserved so declared
/// field order survives through to responses.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    fields: Vec<(&'static str, DocValue)>,
}

impl Document {
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    #[must_use]
    pub fn from_fields(fields: Vec<(&'static str, DocValue)>) -> Self {
        let mut doc = Self::new();
        for (name, value) in fields {
            doc.set(name, value);
        }
        doc
    }

    /// Look up a field value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DocValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut DocValue> {
        self.fields
            .iter_mut()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Set a field value, replacing in place or appending in order.
    pub fn set(&mut self, name: &'static str, value: DocValue) {
        if let Some(slot) = self.get_mut(name) {
            *slot = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, DocValue)> {
        self.fields.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The storage identifier, when this is a root document with one.
    #[must_use]
    pub fn id(&self) -> Option<Ulid> {
        match self.get(ID_FIELD) {
            Some(DocValue::Id(id)) => Some(*id),
            _ => None,
        }
    }

    /// Walk a dotted field path. An intermediate list matches when any of
    /// its elements does; a trailing list is returned whole.
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&DocValue> {
        let (first, rest) = path.split_first()?;
        let value = self.get(first)?;

        if rest.is_empty() {
            return Some(value);
        }
        match value {
            DocValue::Document(doc) => doc.get_path(rest),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a (&'static str, DocValue);
    type IntoIter = std::slice::Iter<'a, (&'static str, DocValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

///
/// DefaultValue
///
/// Server-side default applied when a document is constructed without an
/// explicit value for the field.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DefaultValue {
    /// Generate a fresh opaque id.
    NewId,
    /// The current UTC timestamp.
    Now,
}

impl DefaultValue {
    #[must_use]
    pub fn materialize(self) -> DocValue {
        match self {
            Self::NewId => DocValue::Id(Ulid::new()),
            Self::Now => DocValue::DateTime(Utc::now()),
        }
    }
}

///
/// FieldSpec
///
/// Storage-side metadata for one field: defaulting, uniqueness, and the
/// validation constraints enforced on save. Embedded document fields carry
/// a nested schema.
///

#[derive(Clone, Debug, Default)]
pub struct FieldSpec {
    name: &'static str,
    default: Option<DefaultValue>,
    required: bool,
    unique: bool,
    max_length: Option<usize>,
    embedded: Option<Schema>,
}

impl FieldSpec {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub const fn max_length(mut self, limit: usize) -> Self {
        self.max_length = Some(limit);
        self
    }

    /// Attach the schema governing an embedded document (or each element
    /// of an embedded list).
    #[must_use]
    pub fn embedded(mut self, schema: Schema) -> Self {
        self.embedded = Some(schema);
        self
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    #[must_use]
    pub const fn embedded_schema(&self) -> Option<&Schema> {
        self.embedded.as_ref()
    }
}

///
/// Schema
///
/// The storage collaborator's view of a document shape. The serializer
/// decides what crosses the wire; the schema decides what the store will
/// accept and which fields it fills in itself.
///

#[derive(Clone, Debug, Default)]
pub struct Schema {
    name: &'static str,
    fields: Vec<FieldSpec>,
}

impl Schema {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        debug_assert!(
            !self.fields.iter().any(|f| f.name == spec.name),
            "duplicate field '{}' on schema '{}'",
            spec.name,
            self.name
        );
        self.fields.push(spec);
        self
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn specs(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    /// Construct a fresh document with every declared default applied.
    #[must_use]
    pub fn new_document(&self) -> Document {
        let mut doc = Document::new();
        for spec in &self.fields {
            if let Some(default) = spec.default {
                doc.set(spec.name, default.materialize());
            }
        }
        doc
    }

    /// Fill missing defaults on an existing document in place.
    pub fn apply_defaults(&self, doc: &mut Document) {
        for spec in &self.fields {
            if let Some(default) = spec.default {
                let missing = matches!(doc.get(spec.name), None | Some(DocValue::Null));
                if missing {
                    doc.set(spec.name, default.materialize());
                }
            }
        }
    }

    /// Validate a document tree against this schema.
    ///
    /// Returns one `(dotted path, message)` entry per violation. List
    /// elements appear with their index in the path, `comments.1.text`.
    #[must_use]
    pub fn validate(&self, doc: &Document) -> Vec<(String, String)> {
        let mut errors = Vec::new();
        self.validate_into(doc, "", &mut errors);
        errors
    }

    fn validate_into(&self, doc: &Document, prefix: &str, errors: &mut Vec<(String, String)>) {
        for spec in &self.fields {
            let path = if prefix.is_empty() {
                spec.name.to_string()
            } else {
                format!("{prefix}.{}", spec.name)
            };
            let value = doc.get(spec.name);

            if spec.required && matches!(value, None | Some(DocValue::Null)) {
                errors.push((path, "field is required".to_string()));
                continue;
            }

            match value {
                Some(DocValue::Text(text)) => {
                    if let Some(limit) = spec.max_length
                        && text.chars().count() > limit
                    {
                        errors.push((
                            path,
                            format!("value is longer than the maximum of {limit}"),
                        ));
                    }
                }
                Some(DocValue::Document(inner)) => {
                    if let Some(schema) = &spec.embedded {
                        schema.validate_into(inner, &path, errors);
                    }
                }
                Some(DocValue::List(items)) => {
                    if let Some(schema) = &spec.embedded {
                        for (index, item) in items.iter().enumerate() {
                            if let DocValue::Document(inner) = item {
                                schema.validate_into(inner, &format!("{path}.{index}"), errors);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }
}
