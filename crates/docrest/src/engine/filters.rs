use crate::{
    engine::EngineError,
    ser::{Field, FieldKind, Serializer},
    store::Filter,
    value::DocValue,
};

/// Parse the query string into equality filters against the root shape.
///
/// The page parameter is reserved and pairs with an empty value are
/// dropped. Dotted paths use the `parent__child` form.
pub fn parse(
    serializer: &Serializer,
    query: &[(String, String)],
    reserved: &str,
) -> Result<Vec<Filter>, EngineError> {
    let mut filters = Vec::new();
    for (key, value) in query {
        if key == reserved || value.is_empty() {
            continue;
        }
        filters.push(parse_one(serializer, key, value)?);
    }
    Ok(filters)
}

fn parse_one(serializer: &Serializer, key: &str, value: &str) -> Result<Filter, EngineError> {
    let mut path = Vec::new();
    let mut current = serializer;
    let mut matched: Option<&Field> = None;

    let segments: Vec<&str> = key.split("__").collect();
    for (position, segment) in segments.iter().enumerate() {
        let field = current.get(segment).ok_or_else(|| invalid_query(key))?;
        path.push(field.name());

        if position + 1 < segments.len() {
            // Intermediate segments must be document-shaped.
            current = field.item_serializer().ok_or_else(|| invalid_query(key))?;
        } else {
            matched = Some(field);
        }
    }
    let field = matched.ok_or_else(|| invalid_query(key))?;

    let parsed = match field.kind() {
        FieldKind::Document(_) => return Err(invalid_query(key)),
        FieldKind::List(_) => {
            let Some(item) = field.item_field() else {
                return Err(invalid_query(key));
            };
            let mut items = Vec::new();
            for part in value.split(',') {
                items.push(item.deserialize_text(part)?);
            }
            DocValue::List(items)
        }
        _ => field.deserialize_text(value)?,
    };

    Ok(Filter {
        path,
        value: parsed,
    })
}

fn invalid_query(key: &str) -> EngineError {
    EngineError::new(400, format!("Invalid query '{key}'"))
}
