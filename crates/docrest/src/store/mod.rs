//! Module: store
//! Responsibility: the persistence collaborator contract and an ordered
//! in-memory implementation of it.
//! Boundary: whole-document replace is the unit of atomicity; embedded
//! documents are never independently addressable.

mod memory;

#[cfg(test)]
mod tests;

pub use memory::MemoryStore;

use crate::{
    document::{Document, Schema},
    value::DocValue,
};
use std::ops::Range;
use thiserror::Error as ThisError;
use ulid::Ulid;

///
/// StoreError
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum StoreError {
    #[error("document '{id}' not found")]
    NotFound { id: Ulid },

    /// The raw detail names the offending constraint; callers decide
    /// whether it may be shown to clients.
    #[error("unique constraint violated: {detail}")]
    NotUnique { detail: String },

    /// Per-field validation failures keyed by dotted path.
    #[error("document failed validation")]
    Validation { errors: Vec<(String, String)> },
}

///
/// Filter
///
/// One equality predicate against a (possibly dotted) field path. An
/// intermediate list segment matches when any element matches.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub path: Vec<&'static str>,
    pub value: DocValue,
}

impl Filter {
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        Self::matches_at(doc, &self.path, &self.value)
    }

    fn matches_at(doc: &Document, path: &[&'static str], value: &DocValue) -> bool {
        let Some((first, rest)) = path.split_first() else {
            return false;
        };
        let Some(current) = doc.get(first) else {
            return false;
        };

        if rest.is_empty() {
            return current == value;
        }
        match current {
            DocValue::Document(inner) => Self::matches_at(inner, rest, value),
            DocValue::List(items) => items.iter().any(|item| {
                item.as_document()
                    .is_some_and(|inner| Self::matches_at(inner, rest, value))
            }),
            _ => false,
        }
    }
}

///
/// DocumentStore
///
/// The contract the resource engine expects from persistence: id lookup,
/// equality filtering with count/slice access for paging, and
/// save-with-validation that reports uniqueness and constraint failures
/// as structured errors.
///

pub trait DocumentStore {
    /// Fetch one root document by storage id.
    fn get(&self, id: Ulid) -> Result<Document, StoreError>;

    /// Count documents matching every filter.
    fn count(&self, filters: &[Filter]) -> usize;

    /// Matching documents within `range`, in insertion order.
    fn select(&self, filters: &[Filter], range: Range<usize>) -> Vec<Document>;

    /// Insert a new root document, enforcing schema constraints.
    fn insert(&mut self, schema: &Schema, doc: &Document) -> Result<(), StoreError>;

    /// Replace the stored document with the same id (upsert), enforcing
    /// schema constraints. This whole-document replace is the only way
    /// nested mutations persist.
    fn save(&mut self, schema: &Schema, doc: &Document) -> Result<(), StoreError>;

    /// Delete one root document by storage id.
    fn delete(&mut self, id: Ulid) -> Result<(), StoreError>;
}
