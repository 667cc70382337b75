pub mod cache;
pub mod client;
pub mod completion;
pub mod config;
pub mod error;
pub mod populate;
pub mod registry;
pub mod types;

pub use cache::{CacheConfig, CacheStats, ResultCache};
pub use client::Client;
pub use config::TabulaConfig;
pub use error::EngineError;
pub use populate::Mapper;
pub use registry::TypeRegistry;
