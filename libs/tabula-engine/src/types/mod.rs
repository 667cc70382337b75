//! Built-in column types.
//!
//! | type     | detected by                                  | representations          |
//! |----------|----------------------------------------------|--------------------------|
//! | `date`   | `col`, `col/_source`, `col/_utc`             | timestamp, integer, text |
//! | `money`  | `col`, `col/_source`, `col/_currency`        | money, number, text      |
//! | `string` | anything (registry default)                  | text                     |
//!
//! `string` coerces any request to text, but declares only text: non-text
//! fields over a plain column fail the mapper's compatibility check and are
//! skipped instead of failing assignment.

mod date;
mod money;
mod string;

use std::sync::Arc;

use tabula_api::column_type::ColumnType;

pub use date::DateType;
pub use money::MoneyType;
pub use string::StringType;

/// Look up a built-in type by its `name()`.
pub fn builtin(name: &str) -> Option<Arc<dyn ColumnType>> {
    match name {
        "date" => Some(Arc::new(DateType)),
        "money" => Some(Arc::new(MoneyType)),
        "string" => Some(Arc::new(StringType)),
        _ => None,
    }
}
