use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

/// Cooperative cancellation flag shared between a request and the provider
/// calls it spawns.
///
/// Clones observe the same flag. Once cancelled it stays cancelled.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation. Wakes every pending [`cancelled`](Self::cancelled).
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Sender lives in `self`, so the channel cannot close under us.
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-request context handed to every provider call.
#[derive(Clone, Debug)]
pub struct FetchContext {
    /// Cancellation for this request
    pub cancel: CancelSignal,

    /// Reference instant for range cutoffs and capture timestamps
    pub now: DateTime<Utc>,
}

impl FetchContext {
    pub fn new() -> Self {
        Self {
            cancel: CancelSignal::new(),
            now: Utc::now(),
        }
    }

    /// Context bound to an existing cancellation signal.
    pub fn with_cancel(cancel: CancelSignal) -> Self {
        Self {
            cancel,
            now: Utc::now(),
        }
    }

    /// Context pinned to a fixed reference instant.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            cancel: CancelSignal::new(),
            now,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for FetchContext {
    fn default() -> Self {
        Self::new()
    }
}
