use tabula_api::error::{AssignmentError, ConstructionError, FetchError, TypeError};
use tabula_api::schema::Representation;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Construction(#[from] ConstructionError),

    #[error("assignment failed: {0}")]
    Assignment(#[from] AssignmentError),

    #[error("column type '{type_name}' claimed {representation} for column '{column}' but cannot produce it")]
    UnsupportedRepresentation {
        type_name: &'static str,
        column: String,
        representation: Representation,
    },

    #[error("row {row}, column '{column}': {source}")]
    Coercion {
        row: usize,
        column: String,
        #[source]
        source: TypeError,
    },

    #[error("invalid target shape: {0}")]
    InvalidShape(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Config` and `InvalidShape`, context is prepended to the message.
    /// Other variants carry structured data and are returned unchanged.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            EngineError::InvalidShape(msg) => EngineError::InvalidShape(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}
