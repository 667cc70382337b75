use std::str::FromStr;

use rust_decimal::Decimal;

use tabula_api::column_type::{
    ColumnType, CURRENCY_SUFFIX, SOURCE_SUFFIX, required, required_text, sidecar,
};
use tabula_api::error::TypeError;
use tabula_api::schema::Representation;
use tabula_api::value::{CurrencyCode, Money, Row, Scalar, Value};

/// Money column. The source sends three columns for an amount `col`:
/// - `col`: the magnitude (`20.3`)
/// - `col/_currency`: the currency code (`"USD"`)
/// - `col/_source`: what the source displayed (`"$20.30"`)
///
/// Structured amounts are always built from `col` + `col/_currency`; the
/// `_source` text is locale-dependent and never parsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoneyType;

const REPRESENTATIONS: &[Representation] = &[
    Representation::Money,
    Representation::Number,
    Representation::Text,
];

impl MoneyType {
    fn amount(row: &Row, column: &str) -> Result<Decimal, TypeError> {
        let malformed = |e: rust_decimal::Error| TypeError::malformed(column, e.to_string());
        match required(row, column)? {
            Scalar::Int(v) => Ok(Decimal::from(*v)),
            // Shortest round-trip text keeps `20.3` as 20.3 rather than its binary expansion.
            Scalar::Float(v) if v.is_finite() => Decimal::from_str(&v.to_string()).map_err(malformed),
            Scalar::Str(s) => Decimal::from_str(s.trim()).map_err(malformed),
            other => Err(TypeError::malformed(column, format!("not an amount: {other}"))),
        }
    }

    fn number(row: &Row, column: &str) -> Result<f64, TypeError> {
        match required(row, column)? {
            Scalar::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| TypeError::malformed(column, e.to_string())),
            other => other
                .as_f64()
                .ok_or_else(|| TypeError::malformed(column, format!("not a number: {other}"))),
        }
    }

    fn currency(row: &Row, column: &str) -> Result<CurrencyCode, TypeError> {
        let currency_column = sidecar(column, CURRENCY_SUFFIX);
        required_text(row, &currency_column)?
            .parse()
            .map_err(|e: tabula_api::value::CurrencyError| {
                TypeError::malformed(currency_column.as_str(), e.to_string())
            })
    }
}

impl ColumnType for MoneyType {
    fn name(&self) -> &'static str {
        "money"
    }

    fn representations(&self) -> &'static [Representation] {
        REPRESENTATIONS
    }

    fn is_column_of_type(&self, example_row: &Row, column: &str) -> bool {
        example_row.contains(column)
            && example_row.contains(&sidecar(column, SOURCE_SUFFIX))
            && example_row.contains(&sidecar(column, CURRENCY_SUFFIX))
    }

    fn value_as(
        &self,
        row: &Row,
        column: &str,
        representation: Representation,
    ) -> Result<Value, TypeError> {
        match representation {
            Representation::Money => {
                let currency = Self::currency(row, column)?;
                let amount = Self::amount(row, column)?;
                Ok(Value::Money(Money::new(currency, amount)))
            }
            Representation::Number => Self::number(row, column).map(Value::Number),
            Representation::Text => {
                let source = sidecar(column, SOURCE_SUFFIX);
                required_text(row, &source).map(|s| Value::Text(s.to_string()))
            }
            other => Err(TypeError::UnsupportedRepresentation {
                type_name: self.name(),
                representation: other,
            }),
        }
    }
}
