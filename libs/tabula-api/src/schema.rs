use std::fmt;

/// Target-side shape a coerced value must conform to.
///
/// Closed set: column types declare which of these they can produce, fields
/// declare which one they accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    Text,
    Number,
    Integer,
    Money,
    Timestamp,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Representation::Text => f.write_str("text"),
            Representation::Number => f.write_str("number"),
            Representation::Integer => f.write_str("integer"),
            Representation::Money => f.write_str("money"),
            Representation::Timestamp => f.write_str("timestamp"),
        }
    }
}

/// How a target field is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Receives the 0-based row ordinal, never column data.
    Identity,
    /// Receives the value of `column`, coerced to `representation`.
    Attribute {
        column: &'static str,
        representation: Representation,
    },
}

/// One member of a target shape.
///
/// Fields without a role are simply not described and stay untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub role: FieldRole,
}

impl FieldDescriptor {
    pub const fn identity(name: &'static str) -> Self {
        Self {
            name,
            role: FieldRole::Identity,
        }
    }

    pub const fn attribute(
        name: &'static str,
        column: &'static str,
        representation: Representation,
    ) -> Self {
        Self {
            name,
            role: FieldRole::Attribute {
                column,
                representation,
            },
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.role, FieldRole::Identity)
    }

    /// Source column, for attribute fields.
    pub fn column(&self) -> Option<&'static str> {
        match self.role {
            FieldRole::Attribute { column, .. } => Some(column),
            FieldRole::Identity => None,
        }
    }
}
