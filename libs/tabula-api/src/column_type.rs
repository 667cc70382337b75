use crate::error::TypeError;
use crate::schema::Representation;
use crate::value::{Row, Scalar, Value};

/// Sidecar suffix carrying the literal text the source showed.
pub const SOURCE_SUFFIX: &str = "_source";
/// Sidecar suffix carrying a currency code.
pub const CURRENCY_SUFFIX: &str = "_currency";
/// Sidecar suffix carrying a normalized UTC date literal.
pub const UTC_SUFFIX: &str = "_utc";

/// Name of the sidecar column `suffix` attached to `column` (`price/_currency`).
pub fn sidecar(column: &str, suffix: &str) -> String {
    format!("{column}/{suffix}")
}

/// One column encoding convention.
///
/// Solves two tasks:
/// - detection: does `column` follow this convention, judging by one example row?
/// - coercion: produce a `Value` of a requested representation from a row.
///
/// Detection rules of types registered side by side must be mutually
/// exclusive on real data; registration order only breaks ties.
pub trait ColumnType: Send + Sync {
    /// Stable identity. Registries keep types unique by name.
    fn name(&self) -> &'static str;

    /// Representations `value_as` can produce.
    fn representations(&self) -> &'static [Representation];

    /// Pure predicate over a single representative row.
    fn is_column_of_type(&self, example_row: &Row, column: &str) -> bool;

    /// Coerce the value of `column` in `row` to `representation`.
    fn value_as(
        &self,
        row: &Row,
        column: &str,
        representation: Representation,
    ) -> Result<Value, TypeError>;

    fn supports(&self, representation: Representation) -> bool {
        self.representations().contains(&representation)
    }
}

/// Fetch a column that must be present.
pub fn required<'a>(row: &'a Row, column: &str) -> Result<&'a Scalar, TypeError> {
    row.get(column)
        .ok_or_else(|| TypeError::MissingColumn(column.to_string()))
}

/// Fetch a column that must be present and textual.
pub fn required_text<'a>(row: &'a Row, column: &str) -> Result<&'a str, TypeError> {
    let value = required(row, column)?;
    value
        .as_str()
        .ok_or_else(|| TypeError::malformed(column, format!("expected text, got {value}")))
}
