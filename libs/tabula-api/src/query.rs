use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::value::RowSet;

/// Query description handed to the transport.
///
/// - `sources`: identifiers of the data sources (connectors) to query
/// - `inputs`: named input parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    /// Canonical cache key. Sources stay in query order, since transports
    /// return rows source by source; input order does not matter.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            sources: self.sources.clone(),
            inputs: self.inputs.clone(),
        }
    }
}

/// Canonical identity of a query. Queries that yield the same rows in the
/// same order compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    sources: Vec<String>,
    inputs: BTreeMap<String, String>,
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<&str> = self.sources.iter().map(String::as_str).collect();
        write!(f, "[{}]", sources.join(","))?;
        for (k, v) in &self.inputs {
            write!(f, " {k}={v}")?;
        }
        Ok(())
    }
}

/// Query transport.
///
/// Resolves once the query is finished: `Ok` with the complete row set (an
/// empty set when the query ran and matched nothing) or `Err` on a transport
/// failure.
pub trait QueryExecutor: Send + Sync {
    fn execute(
        &self,
        query: &Query,
    ) -> Pin<Box<dyn Future<Output = Result<RowSet, FetchError>> + Send + '_>>;
}
