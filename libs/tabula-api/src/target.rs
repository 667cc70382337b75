use chrono::{DateTime, Utc};

use crate::error::{AssignmentError, ConstructionError};
use crate::schema::{FieldDescriptor, Representation};
use crate::value::{Money, Value};

/// A type rows can be mapped onto.
///
/// Usually generated by `#[derive(Target)]`:
///
/// ```ignore
/// #[derive(Default, Target)]
/// pub struct Product {
///     #[id]
///     pub id: u64,
///     #[attribute("name")]
///     pub name: String,
///     #[attribute("price")]
///     pub price: Option<Money>,
///     pub note: String, // not described, left untouched
/// }
/// ```
pub trait Target: Sized {
    /// Static description of the populated fields.
    fn fields() -> &'static [FieldDescriptor];

    /// Fresh, default-valued instance.
    fn construct() -> Result<Self, ConstructionError>;

    /// Write a coerced value into the attribute field `field`.
    fn assign(&mut self, field: &str, value: Value) -> Result<(), AssignmentError>;

    /// Write the row ordinal into the identity field `field`.
    fn assign_identity(&mut self, field: &str, index: usize) -> Result<(), AssignmentError>;
}

/// Representation a field type accepts. Drives the descriptor the derive emits.
pub trait Represented {
    const REPRESENTATION: Representation;
}

/// Typed extraction from a coerced `Value`.
///
/// Returns the value back on mismatch so the caller can report what it got.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, Value>;
}

impl Represented for String {
    const REPRESENTATION: Representation = Representation::Text;
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl Represented for f64 {
    const REPRESENTATION: Representation = Representation::Number;
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Number(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl Represented for i64 {
    const REPRESENTATION: Representation = Representation::Integer;
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Integer(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl Represented for Money {
    const REPRESENTATION: Representation = Representation::Money;
}

impl FromValue for Money {
    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Money(m) => Ok(m),
            other => Err(other),
        }
    }
}

impl Represented for DateTime<Utc> {
    const REPRESENTATION: Representation = Representation::Timestamp;
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            other => Err(other),
        }
    }
}

impl<T: Represented> Represented for Option<T> {
    const REPRESENTATION: Representation = T::REPRESENTATION;
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, Value> {
        T::from_value(value).map(Some)
    }
}

/// Shared setter body for generated and hand-written `Target::assign` impls.
pub fn assign_value<T: FromValue + Represented>(
    slot: &mut T,
    field: &str,
    value: Value,
) -> Result<(), AssignmentError> {
    match T::from_value(value) {
        Ok(v) => {
            *slot = v;
            Ok(())
        }
        Err(got) => Err(AssignmentError::mismatch(
            field,
            T::REPRESENTATION,
            got.representation(),
        )),
    }
}

/// Shared setter body for identity fields.
pub fn assign_index<T: TryFrom<usize>>(
    slot: &mut T,
    field: &str,
    index: usize,
) -> Result<(), AssignmentError> {
    *slot = T::try_from(index).map_err(|_| AssignmentError::identity_out_of_range(field, index))?;
    Ok(())
}
