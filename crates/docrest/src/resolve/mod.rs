//! Module: resolve
//! Responsibility: walking a slash-delimited path against the serializer
//! tree and the live document tree, producing a `Resolution` plan the
//! engine mutates through.
//! Does not own: verb semantics or persistence; the resolver reads, never
//! writes.

#[cfg(test)]
mod tests;

use crate::{
    document::{Document, ID_FIELD},
    ser::{Field, FieldKind, Serializer},
    store::DocumentStore,
    value::DocValue,
};
use thiserror::Error as ThisError;
use tracing::debug;
use ulid::Ulid;

///
/// ResolveError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ResolveError {
    #[error("the resource specified with identifier '{segment}' could not be found")]
    NotFound { segment: String },

    #[error("the formatting of the identifier '{segment}' is invalid")]
    BadIdentifier { segment: String },
}

impl ResolveError {
    fn not_found(segment: &str) -> Self {
        Self::NotFound {
            segment: segment.to_string(),
        }
    }

    fn bad_identifier(segment: &str) -> Self {
        Self::BadIdentifier {
            segment: segment.to_string(),
        }
    }
}

///
/// TargetKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TargetKind {
    /// A collection: the root listing or a nested list field.
    List,
    /// A single document: the root item, a list element, or an embedded
    /// document field.
    Item,
    /// A bare scalar field.
    Scalar,
}

///
/// Step
///
/// One hop of the location of a target inside its base document.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Step {
    Field(&'static str),
    Item(usize),
}

///
/// PendingCreate
///
/// A deferred creation: the final path segment named an identifier that
/// matched nothing, under a method allowed to create at that location.
///

#[derive(Clone, Debug, PartialEq)]
pub struct PendingCreate {
    pub identifier_field: &'static str,
    pub identifier: DocValue,
}

///
/// Resolution
///
/// Where in the document graph a request points, plus enough context to
/// mutate there: the base document that must be re-saved, the step path
/// to the target inside it, and the serializer nodes governing it.
///

#[derive(Debug)]
pub struct Resolution<'s> {
    pub kind: TargetKind,
    /// Serializer of the nearest governing document shape. For an item
    /// this is the item's own shape; for a nested list it is the shape of
    /// the document *holding* the list (use `field.item_serializer()` for
    /// the element shape); for the root collection it is the root shape.
    pub serializer: &'s Serializer,
    /// The field addressed by the final consumed segment, when the target
    /// sits below the root document.
    pub field: Option<&'s Field>,
    /// The fetched root document; absent for the root collection and for
    /// a pending root create.
    pub base: Option<Document>,
    /// Location of the target inside `base`; empty means the base itself.
    /// When a create is pending on a nested list, the steps address the
    /// list to append to.
    pub steps: Vec<Step>,
    pub create_pending: Option<PendingCreate>,
    /// True when the target is the root collection or the root item; only
    /// there do query filters and paging apply.
    pub is_base_document: bool,
}

impl Resolution<'_> {
    /// True when the target is an element of a list, which is what makes
    /// it deletable.
    #[must_use]
    pub fn in_parent_list(&self) -> bool {
        matches!(self.steps.last(), Some(Step::Item(_)))
    }
}

/// Split a path into its segments, dropping empties (leading slash,
/// trailing slash, doubled separators).
#[must_use]
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Resolve a path against the root serializer and live storage.
///
/// `create_on_missing` is the PUT tie-break: an unmatched identifier in
/// the final position becomes a pending create instead of a not-found,
/// at the root and inside identifier-bearing lists alike.
pub fn resolve<'s>(
    store: &dyn DocumentStore,
    root: &'s Serializer,
    path: &str,
    create_on_missing: bool,
) -> Result<Resolution<'s>, ResolveError> {
    let segments = segments(path);

    let Some((first, rest)) = segments.split_first() else {
        // Listing endpoint.
        return Ok(Resolution {
            kind: TargetKind::List,
            serializer: root,
            field: None,
            base: None,
            steps: Vec::new(),
            create_pending: None,
            is_base_document: true,
        });
    };

    let id = Ulid::from_string(first).map_err(|_| ResolveError::bad_identifier(first))?;
    let base = match store.get(id) {
        Ok(doc) => doc,
        Err(_) => {
            if create_on_missing && rest.is_empty() {
                debug!(%id, "root identifier unmatched, deferring create");
                return Ok(Resolution {
                    kind: TargetKind::Item,
                    serializer: root,
                    field: None,
                    base: None,
                    steps: Vec::new(),
                    create_pending: Some(PendingCreate {
                        identifier_field: ID_FIELD,
                        identifier: DocValue::Id(id),
                    }),
                    is_base_document: true,
                });
            }
            return Err(ResolveError::not_found(first));
        }
    };

    let cursor = Cursor {
        kind: TargetKind::Item,
        serializer: root,
        field: None,
        steps: Vec::new(),
        create_pending: None,
    };
    let cursor = walk(cursor, &base, rest, create_on_missing)?;

    Ok(Resolution {
        kind: cursor.kind,
        serializer: cursor.serializer,
        field: cursor.field,
        base: Some(base),
        steps: cursor.steps,
        create_pending: cursor.create_pending,
        is_base_document: rest.is_empty(),
    })
}

///
/// Cursor
///
/// The explicit traversal state: one value in, one value out per segment.
/// No mutation is shared between recursion levels.
///

struct Cursor<'s> {
    kind: TargetKind,
    serializer: &'s Serializer,
    field: Option<&'s Field>,
    steps: Vec<Step>,
    create_pending: Option<PendingCreate>,
}

fn walk<'s>(
    cursor: Cursor<'s>,
    base: &Document,
    segments: &[&str],
    create_on_missing: bool,
) -> Result<Cursor<'s>, ResolveError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(cursor);
    };

    // Nothing can be addressed below a not-yet-created item.
    if cursor.create_pending.is_some() {
        return Err(ResolveError::not_found(segment));
    }

    let next = match cursor.kind {
        TargetKind::List => {
            descend_list(cursor, base, segment, rest.is_empty(), create_on_missing)?
        }
        TargetKind::Item => descend_field(cursor, segment)?,
        TargetKind::Scalar => return Err(ResolveError::not_found(segment)),
    };

    walk(next, base, rest, create_on_missing)
}

/// Consume a segment as an item identifier inside the current list.
fn descend_list<'s>(
    cursor: Cursor<'s>,
    base: &Document,
    segment: &str,
    is_last: bool,
    create_on_missing: bool,
) -> Result<Cursor<'s>, ResolveError> {
    let item_serializer = cursor
        .field
        .and_then(Field::item_serializer)
        .ok_or_else(|| ResolveError::not_found(segment))?;

    // Items in a list without a declared identifier cannot be addressed.
    let id_field = item_serializer
        .identifier()
        .ok_or_else(|| ResolveError::not_found(segment))?;

    let identifier = id_field
        .deserialize_text(segment)
        .map_err(|_| ResolveError::bad_identifier(segment))?;

    // A list field never written yet reads as empty, so a pending create
    // can still target it.
    let items: &[DocValue] = match locate(base, &cursor.steps) {
        Some(DocValue::List(items)) => items,
        None | Some(DocValue::Null) => &[],
        Some(_) => return Err(ResolveError::not_found(segment)),
    };

    let matched = items.iter().position(|item| {
        item.as_document()
            .is_some_and(|doc| doc.get(id_field.name()) == Some(&identifier))
    });

    match matched {
        Some(index) => {
            let mut steps = cursor.steps;
            steps.push(Step::Item(index));
            Ok(Cursor {
                kind: TargetKind::Item,
                serializer: item_serializer,
                field: cursor.field,
                steps,
                create_pending: None,
            })
        }
        None if create_on_missing && is_last => {
            debug!(segment, "list identifier unmatched, deferring create");
            Ok(Cursor {
                kind: TargetKind::Item,
                serializer: item_serializer,
                field: cursor.field,
                // Steps stay on the list so the engine knows where to
                // append the created item.
                steps: cursor.steps,
                create_pending: Some(PendingCreate {
                    identifier_field: id_field.name(),
                    identifier,
                }),
            })
        }
        None => Err(ResolveError::not_found(segment)),
    }
}

/// Consume a segment as a field name on the current document shape.
fn descend_field<'s>(cursor: Cursor<'s>, segment: &str) -> Result<Cursor<'s>, ResolveError> {
    let field = cursor
        .serializer
        .get(segment)
        .ok_or_else(|| ResolveError::not_found(segment))?;

    let mut steps = cursor.steps;
    steps.push(Step::Field(field.name()));

    let (kind, serializer) = match field.kind() {
        FieldKind::Document(sub) => (TargetKind::Item, sub),
        FieldKind::List(_) => (TargetKind::List, cursor.serializer),
        _ => (TargetKind::Scalar, cursor.serializer),
    };

    Ok(Cursor {
        kind,
        serializer,
        field: Some(field),
        steps,
        create_pending: None,
    })
}

/// Walk a step path through a live document tree.
#[must_use]
pub fn locate<'d>(base: &'d Document, steps: &[Step]) -> Option<&'d DocValue> {
    let (first, rest) = steps.split_first()?;
    let Step::Field(name) = first else {
        return None;
    };

    let mut current = base.get(name)?;
    for step in rest {
        current = match step {
            Step::Field(name) => current.as_document()?.get(name)?,
            Step::Item(index) => current.as_list()?.get(*index)?,
        };
    }

    Some(current)
}

/// Mutable variant of [`locate`].
pub fn locate_mut<'d>(base: &'d mut Document, steps: &[Step]) -> Option<&'d mut DocValue> {
    let (first, rest) = steps.split_first()?;
    let Step::Field(name) = first else {
        return None;
    };

    let mut current = base.get_mut(name)?;
    for step in rest {
        current = match step {
            Step::Field(name) => current.as_document_mut()?.get_mut(name)?,
            Step::Item(index) => current.as_list_mut()?.get_mut(*index)?,
        };
    }

    Some(current)
}
