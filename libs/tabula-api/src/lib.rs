// Lets `#[derive(Target)]` expand to `tabula_api::...` paths inside this crate too.
extern crate self as tabula_api;

pub mod column_type;
pub mod error;
pub mod query;
pub mod schema;
pub mod target;
pub mod value;

pub use tabula_api_derive::Target;

pub use column_type::ColumnType;
pub use error::{AssignmentError, ConstructionError, FetchError, TypeError};
pub use query::{Fingerprint, Query, QueryExecutor};
pub use schema::{FieldDescriptor, FieldRole, Representation};
pub use target::{FromValue, Represented, Target};
pub use value::{CurrencyCode, Money, Row, RowSet, Scalar, Value};
