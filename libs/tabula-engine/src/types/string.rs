use tabula_api::column_type::{ColumnType, required};
use tabula_api::error::TypeError;
use tabula_api::schema::Representation;
use tabula_api::value::{Row, Value};

/// Fallback type: any column has a textual form.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

const REPRESENTATIONS: &[Representation] = &[Representation::Text];

impl ColumnType for StringType {
    fn name(&self) -> &'static str {
        "string"
    }

    fn representations(&self) -> &'static [Representation] {
        REPRESENTATIONS
    }

    fn is_column_of_type(&self, _example_row: &Row, _column: &str) -> bool {
        true
    }

    /// Always the primary column's text, whatever was asked for.
    fn value_as(
        &self,
        row: &Row,
        column: &str,
        _representation: Representation,
    ) -> Result<Value, TypeError> {
        required(row, column).map(|v| Value::Text(v.to_text()))
    }
}
