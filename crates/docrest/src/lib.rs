//! ## Crate layout
//! - `value`: wire-type tags and the internal document value model.
//! - `document`: the ordered live document tree and storage schemas.
//! - `ser`: fields, serializers, and visibility rules for wire conversion.
//! - `resolve`: the slash-path resolver over the serializer and document trees.
//! - `engine`: verb dispatch, deep updates, filters, paging, error mapping.
//! - `store`: the persistence collaborator contract and an in-memory store.
//!
//! The `prelude` module exposes what a resource definition needs.

pub mod document;
pub mod engine;
pub mod resolve;
pub mod ser;
pub mod store;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// CONSTANTS
///

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///
/// Only the definition-time vocabulary: shapes, schemas, the resource
/// itself, and the request/response currency of the engine.
///

pub mod prelude {
    pub use crate::{
        document::{DefaultValue, Document, FieldSpec, Schema},
        engine::{Method, Request, Resource, Response},
        ser::{Field, Serializer},
        store::{DocumentStore, MemoryStore},
        value::DocValue,
    };
}
