//! Workers and the topic registry.
//!
//! A worker is any async `Item -> Ack` function. Closures qualify through a
//! blanket impl, so registering one is just:
//!
//! ```rust,no_run
//! # async fn demo() {
//! use expresslane::{Ack, Item, Queue};
//!
//! let q = Queue::new();
//! q.register("greet", |item: Item| async move {
//!     Ack::ok(format!("hello {}", item.data))
//! });
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::model::{Ack, Item};

/// Future returned by a worker invocation.
pub type WorkerFuture = Pin<Box<dyn Future<Output = Ack> + Send + 'static>>;

/// Shared handle to a registered worker.
pub type WorkerRef = Arc<dyn Worker>;

/// Handles items published under the topics it is registered for.
///
/// Each call gets its own copy of the item and must produce a fresh future;
/// state shared between calls belongs in an explicit `Arc` inside the worker.
pub trait Worker: Send + Sync + 'static {
    fn handle(&self, item: Item) -> WorkerFuture;
}

impl<F, Fut> Worker for F
where
    F: Fn(Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Ack> + Send + 'static,
{
    fn handle(&self, item: Item) -> WorkerFuture {
        Box::pin(self(item))
    }
}

/// Workers indexed by topic, in registration order.
#[derive(Default)]
pub(crate) struct Registry {
    workers: HashMap<String, Vec<WorkerRef>>,
}

impl Registry {
    pub(crate) fn register(&mut self, topic: String, worker: WorkerRef) {
        self.workers.entry(topic).or_default().push(worker);
    }

    /// Snapshot of the workers currently registered for `topic`.
    pub(crate) fn workers_for(&self, topic: &str) -> Vec<WorkerRef> {
        self.workers.get(topic).cloned().unwrap_or_default()
    }

    pub(crate) fn count(&self, topic: &str) -> usize {
        self.workers.get(topic).map_or(0, Vec::len)
    }

    pub(crate) fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.workers.keys().cloned().collect();
        topics.sort();
        topics
    }
}
