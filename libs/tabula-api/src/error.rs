use std::fmt;
use std::time::Duration;

use crate::schema::Representation;

/// Failure reported by the query transport.
///
/// `Clone` because a single in-flight fetch hands the same outcome to every
/// waiting caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure reported by the executor.
    Transport(String),
    /// The fetch did not complete within the configured timeout.
    Timeout(Duration),
    /// The executor went away without reporting completion.
    Disconnected,
}

impl FetchError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport: {msg}"),
            FetchError::Timeout(after) => write!(f, "timed out after {after:?}"),
            FetchError::Disconnected => f.write_str("executor disconnected before completion"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Column coercion failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// The type was asked for a representation it does not produce.
    UnsupportedRepresentation {
        type_name: &'static str,
        representation: Representation,
    },
    /// A column (primary or sidecar) the type relies on is absent.
    MissingColumn(String),
    /// The column is present but its content cannot be coerced.
    Malformed { column: String, reason: String },
}

impl TypeError {
    pub fn malformed(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::UnsupportedRepresentation {
                type_name,
                representation,
            } => write!(f, "type '{type_name}' cannot produce {representation}"),
            TypeError::MissingColumn(column) => write!(f, "missing column '{column}'"),
            TypeError::Malformed { column, reason } => {
                write!(f, "malformed column '{column}': {reason}")
            }
        }
    }
}

impl std::error::Error for TypeError {}

/// A target instance could not be default-constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructionError {
    pub type_name: &'static str,
    pub message: String,
}

impl ConstructionError {
    pub fn new(type_name: &'static str, msg: impl Into<String>) -> Self {
        Self {
            type_name,
            message: msg.into(),
        }
    }
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot construct {}: {}", self.type_name, self.message)
    }
}

impl std::error::Error for ConstructionError {}

/// A coerced value could not be written into a field.
///
/// Never expected after a successful compatibility check; indicates a bug in
/// a column type or a hand-written `Target` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentError {
    pub field: String,
    pub message: String,
}

impl AssignmentError {
    pub fn new(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: msg.into(),
        }
    }

    pub fn mismatch(field: &str, expected: Representation, got: Representation) -> Self {
        Self::new(field, format!("expected {expected}, got {got}"))
    }

    pub fn unknown_field(field: &str) -> Self {
        Self::new(field, "no such field")
    }

    pub fn identity_out_of_range(field: &str, index: usize) -> Self {
        Self::new(field, format!("row index {index} does not fit the field type"))
    }
}

impl fmt::Display for AssignmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': {}", self.field, self.message)
    }
}

impl std::error::Error for AssignmentError {}
