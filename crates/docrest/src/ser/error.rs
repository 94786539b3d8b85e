use crate::value::WireType;
use thiserror::Error as ThisError;

///
/// SerializeErrorKind
///
/// Leaf failure taxonomy for the serializer layer. Messages are phrased so
/// a parent traceback can be appended verbatim.
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum SerializeErrorKind {
    #[error("unknown field '{fieldname}'")]
    UnknownField { fieldname: String },

    #[error("value for field '{field}' is of type '{actual}' but should be of type '{expected}'")]
    ValueInvalidType {
        field: &'static str,
        expected: WireType,
        actual: WireType,
    },

    #[error("value '{value}' for field '{field}' could not be parsed; it should be in {format} format")]
    ValueInvalidFormat {
        field: &'static str,
        format: &'static str,
        value: String,
    },

    #[error("value supplied to '{serializer}' is of type '{actual}' but should be of type 'Object'")]
    DataInvalidType {
        serializer: &'static str,
        actual: WireType,
    },

    #[error("can't serialize value for field '{field}' because it is a writeonly field")]
    SerializeWriteonlyField { field: &'static str },

    #[error("invalid item serializer for list field '{field}': {detail}")]
    InvalidFieldSerializer {
        field: &'static str,
        detail: &'static str,
    },
}

///
/// SerializeError
///
/// A leaf failure plus the ordered chain of enclosing fields it crossed on
/// the way out. Each wrapping document/list field appends itself via
/// [`SerializeError::with_parent`]; the chain is consumed only to render
/// "in 'x' in 'y'" messages, never for control flow.
///

#[derive(Clone, Debug, PartialEq, ThisError)]
#[error("{kind}{}", parent_traceback(.parents))]
pub struct SerializeError {
    pub kind: SerializeErrorKind,
    pub parents: Vec<&'static str>,
}

impl SerializeError {
    /// Append the enclosing field to the parent chain.
    ///
    /// Chains read innermost-first, matching propagation order.
    #[must_use]
    pub fn with_parent(mut self, field: &'static str) -> Self {
        self.parents.push(field);
        self
    }

    /// True when this is the defensive writeonly-serialize check, which
    /// indicates a serializer construction bug rather than bad input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self.kind,
            SerializeErrorKind::SerializeWriteonlyField { .. }
                | SerializeErrorKind::InvalidFieldSerializer { .. }
        )
    }
}

impl From<SerializeErrorKind> for SerializeError {
    fn from(kind: SerializeErrorKind) -> Self {
        Self {
            kind,
            parents: Vec::new(),
        }
    }
}

/// Render the parent chain suffix, empty when there are no parents.
fn parent_traceback(parents: &[&'static str]) -> String {
    let mut out = String::new();
    for parent in parents {
        out.push_str(" in '");
        out.push_str(parent);
        out.push('\'');
    }
    out
}
