use crate::{
    document::{Document, FieldSpec, Schema},
    ser::{FieldKind, Serializer},
    value::DocValue,
};

/// Merge a deserialized payload onto a live document, in place.
///
/// Readonly fields in the payload are never written back, whatever the
/// deserialize stage let through. Scalars overwrite. An embedded document
/// field merges recursively, leaving unmentioned siblings alone. A list of
/// embedded documents is replaced wholesale: payload elements whose
/// declared identifier matches an existing element merge onto that
/// element, everything else becomes a fresh document with schema defaults
/// applied, and existing elements nothing matched are dropped.
pub fn apply_update(
    serializer: &Serializer,
    schema: Option<&Schema>,
    target: &mut Document,
    payload: &Document,
) {
    for (name, value) in payload {
        let Some(field) = serializer.get(name) else {
            continue;
        };
        if field.is_readonly() {
            continue;
        }

        let nested_schema = schema
            .and_then(|s| s.spec(name))
            .and_then(FieldSpec::embedded_schema);

        match field.kind() {
            FieldKind::List(_) if field.item_serializer().is_some() => {
                if let (Some(sub), DocValue::List(elements)) =
                    (field.item_serializer(), value)
                {
                    let merged = merge_list(sub, nested_schema, target.get(name), elements);
                    target.set(name, DocValue::List(merged));
                } else {
                    target.set(name, value.clone());
                }
            }
            FieldKind::Document(sub) => match value {
                DocValue::Document(partial) => {
                    let mut current = match target.get(name) {
                        Some(DocValue::Document(existing)) => existing.clone(),
                        _ => nested_schema.map(Schema::new_document).unwrap_or_default(),
                    };
                    apply_update(sub, nested_schema, &mut current, partial);
                    target.set(name, DocValue::Document(current));
                }
                other => target.set(name, other.clone()),
            },
            _ => target.set(name, value.clone()),
        }
    }
}

/// Replace-whole-list with identifier matching.
fn merge_list(
    sub: &Serializer,
    schema: Option<&Schema>,
    existing: Option<&DocValue>,
    elements: &[DocValue],
) -> Vec<DocValue> {
    let existing = existing.and_then(DocValue::as_list).unwrap_or_default();
    let id_field = sub.identifier();

    let mut out = Vec::with_capacity(elements.len());
    for element in elements {
        let DocValue::Document(partial) = element else {
            out.push(element.clone());
            continue;
        };

        let matched = id_field.and_then(|idf| {
            let wanted = partial.get(idf.name()).filter(|v| !v.is_null())?;
            existing.iter().find_map(|candidate| {
                candidate
                    .as_document()
                    .filter(|doc| doc.get(idf.name()) == Some(wanted))
            })
        });

        let mut doc = match matched {
            Some(found) => found.clone(),
            None => schema.map(Schema::new_document).unwrap_or_default(),
        };
        apply_update(sub, schema, &mut doc, partial);
        out.push(DocValue::Document(doc));
    }

    out
}
