use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tabula_api::error::FetchError;
use tabula_api::query::{Query, QueryExecutor};
use tabula_api::value::{Row, RowSet};

/// Serves each source from `<dir>/<source>.json`, a JSON array of row objects.
///
/// Rows of several sources are concatenated in query order. Every input
/// `name=value` keeps only rows whose `name` column renders as `value`.
pub struct JsonDirExecutor {
    dir: PathBuf,
}

impl JsonDirExecutor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn load(&self, source: &str) -> Result<RowSet, FetchError> {
        let path = self.dir.join(format!("{source}.json"));
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| FetchError::transport(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| FetchError::transport(format!("{}: {e}", path.display())))
    }
}

fn matches_inputs(row: &Row, query: &Query) -> bool {
    query
        .inputs
        .iter()
        .all(|(name, expected)| row.get(name).is_some_and(|v| v.to_text() == *expected))
}

impl QueryExecutor for JsonDirExecutor {
    fn execute(
        &self,
        query: &Query,
    ) -> Pin<Box<dyn Future<Output = Result<RowSet, FetchError>> + Send + '_>> {
        let query = query.clone();
        Box::pin(async move {
            let mut rows = Vec::new();
            for source in &query.sources {
                let loaded = self.load(source).await?;
                tracing::debug!(source = %source, rows = loaded.len(), "source loaded");
                rows.extend(loaded.iter().filter(|r| matches_inputs(r, &query)).cloned());
            }
            Ok(RowSet::new(rows))
        })
    }
}
