use std::sync::Arc;

use tabula_api::column_type::ColumnType;
use tabula_api::value::Row;

use crate::error::EngineError;
use crate::types::{self, DateType, MoneyType, StringType};

/// Ordered set of column types plus one default.
///
/// Built once, then only read: `resolve` is pure and deterministic.
#[derive(Clone)]
pub struct TypeRegistry {
    types: Vec<Arc<dyn ColumnType>>,
    default_type: Arc<dyn ColumnType>,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.types.iter().map(|t| t.name()).collect();
        f.debug_struct("TypeRegistry")
            .field("types", &names)
            .field("default", &self.default_type.name())
            .finish()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::classic()
    }
}

impl TypeRegistry {
    /// Empty registry: every column resolves to `default_type`.
    pub fn new(default_type: Arc<dyn ColumnType>) -> Self {
        Self {
            types: Vec::new(),
            default_type,
        }
    }

    /// The classic preset: date and money, falling back to string.
    pub fn classic() -> Self {
        let mut registry = Self::new(Arc::new(StringType));
        registry.register(Arc::new(DateType));
        registry.register(Arc::new(MoneyType));
        registry
    }

    /// Build from built-in type names (`"date"`, `"money"`, `"string"`).
    pub fn from_names(registered: &[String], default_type: &str) -> Result<Self, EngineError> {
        let lookup = |name: &str| {
            types::builtin(name)
                .ok_or_else(|| EngineError::Config(format!("unknown column type '{name}'")))
        };

        let mut registry = Self::new(lookup(default_type)?);
        for name in registered {
            registry.register(lookup(name)?);
        }
        Ok(registry)
    }

    /// Add a type. A type with the same name is replaced in place, keeping
    /// its position. Returns `true` if the name was new.
    pub fn register(&mut self, column_type: Arc<dyn ColumnType>) -> bool {
        match self
            .types
            .iter_mut()
            .find(|t| t.name() == column_type.name())
        {
            Some(slot) => {
                *slot = column_type;
                false
            }
            None => {
                self.types.push(column_type);
                true
            }
        }
    }

    pub fn set_default(&mut self, column_type: Arc<dyn ColumnType>) {
        self.default_type = column_type;
    }

    pub fn default_type(&self) -> &dyn ColumnType {
        self.default_type.as_ref()
    }

    /// Registered (non-default) types, in registration order.
    pub fn types(&self) -> impl Iterator<Item = &dyn ColumnType> {
        self.types.iter().map(|t| t.as_ref())
    }

    /// First registered type whose detection matches, else the default.
    pub fn resolve(&self, example_row: &Row, column: &str) -> &dyn ColumnType {
        self.types()
            .find(|t| t.is_column_of_type(example_row, column))
            .unwrap_or_else(|| self.default_type())
    }
}
