//! Bridge from callback-style transports to an awaitable result.
//!
//! Many query clients report progress through a callback: zero or more data
//! messages, then a terminal "finished" or "failed" signal. `channel()` splits
//! that into a [`CompletionSink`] the callback owns and a [`Completion`]
//! future the executor awaits.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use tabula_api::error::FetchError;
use tabula_api::value::{Row, RowSet};

type Outcome = Result<RowSet, FetchError>;

/// Callback side. Accumulates rows until a terminal signal.
#[derive(Debug)]
pub struct CompletionSink {
    rows: Vec<Row>,
    tx: Option<oneshot::Sender<Outcome>>,
}

/// Awaiting side. Resolves once the sink finishes, fails, or is dropped.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Outcome>,
}

pub fn channel() -> (CompletionSink, Completion) {
    let (tx, rx) = oneshot::channel();
    (
        CompletionSink {
            rows: Vec::new(),
            tx: Some(tx),
        },
        Completion { rx },
    )
}

impl CompletionSink {
    /// A data message. Rows are appended in arrival order.
    pub fn message(&mut self, rows: impl IntoIterator<Item = Row>) {
        if self.tx.is_none() {
            tracing::debug!("data message after completion ignored");
            return;
        }
        self.rows.extend(rows);
    }

    /// The query finished. Zero accumulated rows is a successful empty result.
    pub fn finish(&mut self) {
        let rows = std::mem::take(&mut self.rows);
        self.complete(Ok(RowSet::new(rows)));
    }

    /// The query failed at the transport level.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.rows.clear();
        self.complete(Err(FetchError::transport(reason)));
    }

    pub fn is_complete(&self) -> bool {
        self.tx.is_none()
    }

    fn complete(&mut self, outcome: Outcome) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        // Receiver gone means nobody waits for this query anymore.
        let _ = tx.send(outcome);
    }
}

impl Future for Completion {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(FetchError::Disconnected)))
    }
}
