use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::error::EngineError;
use crate::registry::TypeRegistry;

/// Root configuration, parsed from TOML or any registered `ConfigParser`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TabulaConfig {
    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub types: TypesSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CacheSection {
    /// Max number of cached query results.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Time-to-live of a cached result, in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Optional upper bound on a single fetch, in seconds.
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
}

fn default_capacity() -> usize {
    100
}

fn default_ttl_secs() -> u64 {
    3600
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl_secs: default_ttl_secs(),
            fetch_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypesSection {
    /// Built-in column types to register, in resolution order.
    #[serde(default = "default_registered")]
    pub registered: Vec<String>,

    /// Type used when nothing registered matches.
    #[serde(default = "default_type")]
    pub default: String,
}

fn default_registered() -> Vec<String> {
    vec!["date".to_string(), "money".to_string()]
}

fn default_type() -> String {
    "string".to_string()
}

impl Default for TypesSection {
    fn default() -> Self {
        Self {
            registered: default_registered(),
            default: default_type(),
        }
    }
}

/// Config format loader, selected by file extension.
pub trait ConfigParser {
    fn extensions(&self) -> &[&str];
    fn parse(&self, content: &str) -> Result<TabulaConfig, EngineError>;
}

/// Built-in TOML loader.
pub struct TomlParser;

impl ConfigParser for TomlParser {
    fn extensions(&self) -> &[&str] {
        &["toml"]
    }

    fn parse(&self, content: &str) -> Result<TabulaConfig, EngineError> {
        TabulaConfig::parse(content)
    }
}

impl TabulaConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, EngineError> {
        Self::load_with(path, &[&TomlParser])
    }

    /// Load configuration, picking the parser by the file's extension.
    pub fn load_with(path: &str, parsers: &[&dyn ConfigParser]) -> Result<Self, EngineError> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let parser = parsers
            .iter()
            .find(|p| p.extensions().contains(&ext))
            .ok_or_else(|| {
                EngineError::Config(format!("{path}: no config parser for extension '{ext}'"))
            })?;

        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("{path}: {e}")))?;
        parser.parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn cache_config(&self) -> Result<CacheConfig, EngineError> {
        let capacity = NonZeroUsize::new(self.cache.capacity)
            .ok_or_else(|| EngineError::Config("cache.capacity must be at least 1".to_string()))?;
        Ok(CacheConfig {
            capacity,
            ttl: Duration::from_secs(self.cache.ttl_secs),
            fetch_timeout: self.cache.fetch_timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn registry(&self) -> Result<TypeRegistry, EngineError> {
        TypeRegistry::from_names(&self.types.registered, &self.types.default)
            .map_err(|e| e.with_context("types"))
    }
}
