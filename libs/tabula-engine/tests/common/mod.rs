#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use tabula_api::error::FetchError;
use tabula_api::query::{Query, QueryExecutor};
use tabula_api::value::{Money, Row, RowSet};
use tabula_api::Target;

/// Scripted transport: counts executions, optionally waits on a gate.
pub struct MockExecutor {
    calls: AtomicUsize,
    outcome: Result<RowSet, FetchError>,
    gate: Option<watch::Receiver<bool>>,
    delay: Duration,
}

impl MockExecutor {
    pub fn returning(rows: RowSet) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            outcome: Ok(rows),
            gate: None,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(err: FetchError) -> Self {
        Self {
            outcome: Err(err),
            ..Self::returning(RowSet::empty())
        }
    }

    /// Executions block until `true` is sent on the returned gate.
    pub fn gated(mut self) -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        self.gate = Some(rx);
        (self, tx)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QueryExecutor for MockExecutor {
    fn execute(
        &self,
        _query: &Query,
    ) -> Pin<Box<dyn Future<Output = Result<RowSet, FetchError>> + Send + '_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.clone();
        let outcome = self.outcome.clone();
        let delay = self.delay;
        Box::pin(async move {
            if let Some(mut gate) = gate {
                gate.wait_for(|open| *open)
                    .await
                    .map_err(|_| FetchError::Disconnected)?;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            outcome
        })
    }
}

#[derive(Debug, Default, Target)]
pub struct Product {
    #[id]
    pub id: u64,
    #[attribute("name")]
    pub name: String,
    #[attribute("price")]
    pub price: Option<Money>,
    #[attribute("price")]
    pub price_label: String,
    #[attribute("price")]
    pub price_value: f64,
    #[attribute("seen")]
    pub seen: Option<chrono::DateTime<chrono::Utc>>,
    #[attribute("seen")]
    pub seen_utc: String,
    #[attribute("stock")]
    pub stock: String,
    pub note: String,
}

pub fn product_rows() -> RowSet {
    RowSet::new(vec![
        Row::new()
            .with("name", "Desk lamp")
            .with("price", 20.3)
            .with("price/_currency", "USD")
            .with("price/_source", "$20.30")
            .with("seen", 1_000_000_000_000i64)
            .with("seen/_utc", "2001-09-09T01:46:40Z")
            .with("seen/_source", "Sep 9"),
        Row::new()
            .with("name", "Chair")
            .with("price", 45.5)
            .with("price/_currency", "EUR")
            .with("price/_source", "45,50 €")
            .with("seen", 0i64)
            .with("seen/_utc", "1970-01-01T00:00:00Z")
            .with("seen/_source", "long ago"),
        Row::new().with("name", "Mystery box"),
        Row::new()
            .with("name", "Stool")
            .with("price", 12i64)
            .with("price/_currency", "GBP")
            .with("price/_source", "£12")
            .with("seen", 86_400_000i64)
            .with("seen/_utc", "1970-01-02T00:00:00Z")
            .with("seen/_source", "Jan 2"),
    ])
}

pub fn query(name: &str) -> Query {
    Query::new().source("products").input("q", name)
}
