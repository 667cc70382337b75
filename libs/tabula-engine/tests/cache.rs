//! Caching behavior observed through `Client`.

mod common;

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use common::{MockExecutor, Product, product_rows, query};
use tabula_api::error::FetchError;
use tabula_api::query::{Query, QueryExecutor};
use tabula_api::value::{Row, RowSet};
use tabula_engine::cache::CacheConfig;
use tabula_engine::completion;
use tabula_engine::{Client, EngineError, TypeRegistry};

fn client_with(executor: Arc<MockExecutor>, ttl: Duration) -> Client {
    let config = CacheConfig {
        capacity: NonZeroUsize::new(4).unwrap(),
        ttl,
        fetch_timeout: None,
    };
    Client::new(executor, config, TypeRegistry::classic())
}

/// Wait until `n` callers have either started or joined a fetch.
async fn wait_for_callers(client: &Client, n: u64) {
    loop {
        let stats = client.cache().stats();
        if stats.misses + stats.joined >= n {
            return;
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_fetch() {
    let (executor, gate) = MockExecutor::returning(product_rows()).gated();
    let executor = Arc::new(executor);
    let client = Arc::new(Client::with_defaults(executor.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.fetch(&query("lamps"), false).await })
        })
        .collect();

    wait_for_callers(&client, 8).await;
    gate.send(true).unwrap();

    let results = join_all(handles).await;
    let first = results[0].as_ref().unwrap().as_ref().unwrap();
    for result in &results {
        let rows = result.as_ref().unwrap().as_ref().unwrap();
        assert!(Arc::ptr_eq(first, rows));
    }
    assert_eq!(executor.calls(), 1);
    assert_eq!(client.cache().stats().joined, 7);
}

#[tokio::test]
async fn test_concurrent_failure_reaches_every_caller() {
    let (executor, gate) =
        MockExecutor::failing(FetchError::transport("connection refused")).gated();
    let executor = Arc::new(executor);
    let client = client_with(executor.clone(), Duration::from_secs(60));

    let q = query("lamps");
    let callers = join_all((0..5).map(|_| client.fetch(&q, false)));
    let opener = async {
        wait_for_callers(&client, 5).await;
        gate.send(true).unwrap();
    };
    let (results, ()) = tokio::join!(callers, opener);

    for result in results {
        assert!(matches!(
            result,
            Err(EngineError::Fetch(FetchError::Transport(ref msg))) if msg == "connection refused"
        ));
    }
    assert_eq!(executor.calls(), 1);
    assert!(!client.cache().contains(&q.fingerprint()));
}

#[tokio::test]
async fn test_sequential_calls_hit_cache() {
    let executor = Arc::new(MockExecutor::returning(product_rows()));
    let client = client_with(executor.clone(), Duration::from_secs(60));

    let first = client.fetch(&query("lamps"), false).await.unwrap();
    let second = client.fetch(&query("lamps"), false).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(executor.calls(), 1);
    assert_eq!(client.cache().stats().hits, 1);
}

#[tokio::test]
async fn test_equivalent_queries_share_entry() {
    let executor = Arc::new(MockExecutor::returning(product_rows()));
    let client = client_with(executor.clone(), Duration::from_secs(60));

    let a = Query::new().source("a").source("b").input("x", "1").input("y", "2");
    let b = Query::new().source("a").source("b").input("y", "2").input("x", "1");
    client.fetch(&a, false).await.unwrap();
    client.fetch(&b, false).await.unwrap();

    assert_eq!(executor.calls(), 1);
}

#[tokio::test]
async fn test_source_order_is_part_of_key() {
    let executor = Arc::new(MockExecutor::returning(product_rows()));
    let client = client_with(executor.clone(), Duration::from_secs(60));

    let ab = Query::new().source("a").source("b");
    let ba = Query::new().source("b").source("a");
    client.fetch(&ab, false).await.unwrap();
    client.fetch(&ba, false).await.unwrap();

    assert_eq!(executor.calls(), 2);
}

#[tokio::test]
async fn test_distinct_queries_fetch_separately() {
    let executor = Arc::new(MockExecutor::returning(product_rows()));
    let client = client_with(executor.clone(), Duration::from_secs(60));

    client.fetch(&query("lamps"), false).await.unwrap();
    client.fetch(&query("chairs"), false).await.unwrap();

    assert_eq!(executor.calls(), 2);
    assert_eq!(client.cache().len(), 2);
}

#[tokio::test]
async fn test_force_refresh_bypasses_live_entry() {
    let executor = Arc::new(MockExecutor::returning(product_rows()));
    let client = client_with(executor.clone(), Duration::from_secs(60));

    let first = client.fetch(&query("lamps"), false).await.unwrap();
    let refreshed = client.fetch(&query("lamps"), true).await.unwrap();
    let cached = client.fetch(&query("lamps"), false).await.unwrap();

    assert_eq!(executor.calls(), 2);
    assert!(!Arc::ptr_eq(&first, &refreshed));
    assert!(Arc::ptr_eq(&refreshed, &cached));
}

#[tokio::test]
async fn test_force_refresh_joins_fetch_in_flight() {
    let (executor, gate) = MockExecutor::returning(product_rows()).gated();
    let executor = Arc::new(executor);
    let client = client_with(executor.clone(), Duration::from_secs(60));

    let q = query("lamps");
    let plain = client.fetch(&q, false);
    let forced = async {
        wait_for_callers(&client, 1).await;
        client.fetch(&q, true).await
    };
    let opener = async {
        wait_for_callers(&client, 2).await;
        gate.send(true).unwrap();
    };
    let (plain, forced, ()) = tokio::join!(plain, forced, opener);

    assert!(Arc::ptr_eq(&plain.unwrap(), &forced.unwrap()));
    assert_eq!(executor.calls(), 1);
    assert_eq!(client.cache().stats().joined, 1);
}

#[tokio::test]
async fn test_dropped_caller_does_not_strand_fetch() {
    let (executor, gate) = MockExecutor::returning(product_rows()).gated();
    let executor = Arc::new(executor);
    let client = client_with(executor.clone(), Duration::from_secs(60));
    let q = query("lamps");

    let dropped = tokio::time::timeout(Duration::from_millis(10), client.fetch(&q, false)).await;
    assert!(dropped.is_err());

    gate.send(true).unwrap();
    while !client.cache().contains(&q.fingerprint()) {
        tokio::task::yield_now().await;
    }

    client.fetch(&q, false).await.unwrap();
    assert_eq!(executor.calls(), 1);
    assert_eq!(client.cache().stats().hits, 1);

    client.fetch(&q, true).await.unwrap();
    assert_eq!(executor.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_entry_expires_after_ttl() {
    let executor = Arc::new(MockExecutor::returning(product_rows()));
    let client = client_with(executor.clone(), Duration::from_secs(60));

    client.fetch(&query("lamps"), false).await.unwrap();

    tokio::time::advance(Duration::from_secs(59)).await;
    client.fetch(&query("lamps"), false).await.unwrap();
    assert_eq!(executor.calls(), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    client.fetch(&query("lamps"), false).await.unwrap();
    assert_eq!(executor.calls(), 2);
    assert_eq!(client.cache().stats().expirations, 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_times_out() {
    let executor =
        Arc::new(MockExecutor::returning(product_rows()).with_delay(Duration::from_secs(30)));
    let config = CacheConfig {
        fetch_timeout: Some(Duration::from_secs(5)),
        ..CacheConfig::default()
    };
    let client = Client::new(executor, config, TypeRegistry::classic());

    let err = client.fetch(&query("lamps"), false).await.unwrap_err();
    assert!(matches!(err, EngineError::Fetch(FetchError::Timeout(d)) if d == Duration::from_secs(5)));
    assert!(client.cache().is_empty());
}

#[tokio::test]
async fn test_capacity_evicts_least_recent() {
    let executor = Arc::new(MockExecutor::returning(product_rows()));
    let config = CacheConfig {
        capacity: NonZeroUsize::new(2).unwrap(),
        ..CacheConfig::default()
    };
    let client = Client::new(executor.clone(), config, TypeRegistry::classic());

    client.fetch(&query("a"), false).await.unwrap();
    client.fetch(&query("b"), false).await.unwrap();
    client.fetch(&query("a"), false).await.unwrap();
    client.fetch(&query("c"), false).await.unwrap();

    assert!(client.cache().contains(&query("a").fingerprint()));
    assert!(!client.cache().contains(&query("b").fingerprint()));
    assert!(client.cache().contains(&query("c").fingerprint()));
    assert_eq!(executor.calls(), 3);
    assert_eq!(client.cache().stats().evictions, 1);
}

/// Transport that reports pages through a callback on another thread.
struct PagedExecutor {
    pages: Vec<Vec<Row>>,
}

impl QueryExecutor for PagedExecutor {
    fn execute(
        &self,
        _query: &Query,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<RowSet, FetchError>> + Send + '_>,
    > {
        let (mut sink, done) = completion::channel();
        let pages = self.pages.clone();
        std::thread::spawn(move || {
            for page in pages {
                sink.message(page);
            }
            sink.finish();
        });
        Box::pin(done)
    }
}

#[tokio::test]
async fn test_callback_transport_populates() {
    let pages = vec![
        vec![Row::new().with("name", "Desk lamp")],
        vec![Row::new().with("name", "Chair"), Row::new().with("name", "Stool")],
    ];
    let client = Client::with_defaults(Arc::new(PagedExecutor { pages }));

    let products: Vec<Product> = client.populate(&query("all"), false).await.unwrap().unwrap();

    let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Desk lamp", "Chair", "Stool"]);
    assert_eq!(products[2].id, 2);
}
