//! Module: ser
//! Responsibility: the serializer/field type system, wire conversion and
//! per-field visibility (readonly/writeonly/identifier) at every nesting
//! level.
//! Does not own: path resolution or persistence; errors surface as
//! structured `SerializeError` values for the engine to render.

mod error;
mod field;
mod serializer;

#[cfg(test)]
mod tests;

pub use error::{SerializeError, SerializeErrorKind};
pub use field::{Field, FieldKind};
pub use serializer::{Serializer, SerializerBuilder};
