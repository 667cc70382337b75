use chrono::DateTime;

use tabula_api::column_type::{ColumnType, SOURCE_SUFFIX, UTC_SUFFIX, required, required_text, sidecar};
use tabula_api::error::TypeError;
use tabula_api::schema::Representation;
use tabula_api::value::{Row, Scalar, Value};

/// Date column. The source sends three columns for a date `col`:
/// - `col`: epoch timestamp in milliseconds
/// - `col/_source`: the literal the source found (`"Sep 9"`)
/// - `col/_utc`: the normalized UTC literal (`"2001-09-09T01:46:40Z"`)
#[derive(Debug, Clone, Copy, Default)]
pub struct DateType;

const REPRESENTATIONS: &[Representation] = &[
    Representation::Timestamp,
    Representation::Integer,
    Representation::Text,
];

impl DateType {
    fn epoch_millis(row: &Row, column: &str) -> Result<i64, TypeError> {
        match required(row, column)? {
            Scalar::Str(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| TypeError::malformed(column, format!("not an epoch value: {e}"))),
            other => other
                .as_i64()
                .ok_or_else(|| TypeError::malformed(column, format!("not an epoch value: {other}"))),
        }
    }
}

impl ColumnType for DateType {
    fn name(&self) -> &'static str {
        "date"
    }

    fn representations(&self) -> &'static [Representation] {
        REPRESENTATIONS
    }

    fn is_column_of_type(&self, example_row: &Row, column: &str) -> bool {
        example_row.contains(column)
            && example_row.contains(&sidecar(column, SOURCE_SUFFIX))
            && example_row.contains(&sidecar(column, UTC_SUFFIX))
    }

    fn value_as(
        &self,
        row: &Row,
        column: &str,
        representation: Representation,
    ) -> Result<Value, TypeError> {
        match representation {
            Representation::Timestamp => {
                let ms = Self::epoch_millis(row, column)?;
                DateTime::from_timestamp_millis(ms)
                    .map(Value::Timestamp)
                    .ok_or_else(|| TypeError::malformed(column, format!("epoch {ms} out of range")))
            }
            Representation::Integer => Self::epoch_millis(row, column).map(Value::Integer),
            Representation::Text => {
                let utc = sidecar(column, UTC_SUFFIX);
                required_text(row, &utc).map(|s| Value::Text(s.to_string()))
            }
            other => Err(TypeError::UnsupportedRepresentation {
                type_name: self.name(),
                representation: other,
            }),
        }
    }
}
