use std::sync::Arc;

use tabula_api::query::{Fingerprint, Query, QueryExecutor};
use tabula_api::target::Target;
use tabula_api::value::RowSet;

use crate::cache::{CacheConfig, ResultCache};
use crate::config::TabulaConfig;
use crate::error::EngineError;
use crate::populate::Mapper;
use crate::registry::TypeRegistry;

/// Query → typed objects, with cached results.
///
/// Owns its cache and registry; share it behind an `Arc` if needed.
pub struct Client {
    executor: Arc<dyn QueryExecutor>,
    cache: ResultCache<Fingerprint>,
    mapper: Mapper,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("cache", &self.cache)
            .field("registry", self.mapper.registry())
            .finish()
    }
}

impl Client {
    pub fn new(executor: Arc<dyn QueryExecutor>, cache: CacheConfig, registry: TypeRegistry) -> Self {
        Self {
            executor,
            cache: ResultCache::new(cache),
            mapper: Mapper::new(Arc::new(registry)),
        }
    }

    /// Client with the default cache (100 entries, one hour) and classic types.
    pub fn with_defaults(executor: Arc<dyn QueryExecutor>) -> Self {
        Self::new(executor, CacheConfig::default(), TypeRegistry::classic())
    }

    pub fn from_config(
        executor: Arc<dyn QueryExecutor>,
        config: &TabulaConfig,
    ) -> Result<Self, EngineError> {
        Ok(Self::new(executor, config.cache_config()?, config.registry()?))
    }

    pub fn cache(&self) -> &ResultCache<Fingerprint> {
        &self.cache
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Row set for `query`, from cache unless missing, expired or `force_refresh`.
    pub async fn fetch(&self, query: &Query, force_refresh: bool) -> Result<Arc<RowSet>, EngineError> {
        let executor = Arc::clone(&self.executor);
        let owned = query.clone();

        let rows = self
            .cache
            .get_or_fetch(query.fingerprint(), force_refresh, move |fingerprint| async move {
                tracing::debug!(query = %fingerprint, "executing query");
                executor.execute(&owned).await
            })
            .await?;
        Ok(rows)
    }

    /// One `T` per result row; `Ok(None)` when the query produced no rows.
    pub async fn populate<T: Target>(
        &self,
        query: &Query,
        force_refresh: bool,
    ) -> Result<Option<Vec<T>>, EngineError> {
        let rows = self.fetch(query, force_refresh).await?;
        self.mapper.populate(Some(&rows))
    }
}
