use crate::{
    document::{Document, ID_FIELD, Schema},
    store::{DocumentStore, Filter, StoreError},
};
use std::ops::Range;
use tracing::debug;
use ulid::Ulid;

///
/// MemoryStore
///
/// Insertion-ordered in-memory document store. Backs the test suites and
/// demo servers; the trait is the real integration surface.
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Vec<(Ulid, Document)>,
}

impl MemoryStore {
    #[must_use]
    pub const fn new() -> Self {
        Self { docs: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn position(&self, id: Ulid) -> Option<usize> {
        self.docs.iter().position(|(stored, _)| *stored == id)
    }

    fn check(&self, schema: &Schema, doc: &Document, id: Ulid) -> Result<(), StoreError> {
        let errors = schema.validate(doc);
        if !errors.is_empty() {
            return Err(StoreError::Validation { errors });
        }

        for spec in schema.specs().filter(|spec| spec.is_unique()) {
            let Some(value) = doc.get(spec.name()) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let taken = self
                .docs
                .iter()
                .any(|(other, stored)| *other != id && stored.get(spec.name()) == Some(value));
            if taken {
                return Err(StoreError::NotUnique {
                    detail: format!(
                        "field '{}' duplicates an existing document",
                        spec.name()
                    ),
                });
            }
        }

        Ok(())
    }

    fn doc_id(doc: &Document) -> Result<Ulid, StoreError> {
        doc.id().ok_or_else(|| StoreError::Validation {
            errors: vec![(ID_FIELD.to_string(), "missing storage identifier".to_string())],
        })
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, id: Ulid) -> Result<Document, StoreError> {
        self.position(id)
            .map(|index| self.docs[index].1.clone())
            .ok_or(StoreError::NotFound { id })
    }

    fn count(&self, filters: &[Filter]) -> usize {
        self.docs
            .iter()
            .filter(|(_, doc)| filters.iter().all(|filter| filter.matches(doc)))
            .count()
    }

    fn select(&self, filters: &[Filter], range: Range<usize>) -> Vec<Document> {
        self.docs
            .iter()
            .filter(|(_, doc)| filters.iter().all(|filter| filter.matches(doc)))
            .skip(range.start)
            .take(range.len())
            .map(|(_, doc)| doc.clone())
            .collect()
    }

    fn insert(&mut self, schema: &Schema, doc: &Document) -> Result<(), StoreError> {
        let id = Self::doc_id(doc)?;
        self.check(schema, doc, id)?;

        debug!(schema = schema.name(), %id, "insert document");
        self.docs.push((id, doc.clone()));

        Ok(())
    }

    fn save(&mut self, schema: &Schema, doc: &Document) -> Result<(), StoreError> {
        let id = Self::doc_id(doc)?;
        self.check(schema, doc, id)?;

        debug!(schema = schema.name(), %id, "save document");
        match self.position(id) {
            Some(index) => self.docs[index].1 = doc.clone(),
            None => self.docs.push((id, doc.clone())),
        }

        Ok(())
    }

    fn delete(&mut self, id: Ulid) -> Result<(), StoreError> {
        let index = self.position(id).ok_or(StoreError::NotFound { id })?;
        debug!(%id, "delete document");
        self.docs.remove(index);

        Ok(())
    }
}
