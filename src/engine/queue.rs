//! The queue handle. Owns all shared state and enforces the lifecycle.
//!
//! Every piece of bookkeeping (buffer, registry, lineup map, lifecycle)
//! sits behind one queue-wide mutex that is never held across an await.
//! Per-topic exclusivity is the job of the lineup mutexes, which are async
//! and are held for the whole fan-out/join of one item.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::sync::{Notify, oneshot};
use tracing::{debug, info};

use super::dispatch;
use super::receipt::Receipt;
use crate::config::DEFAULT_TICK_MS;
use crate::error::{Error, Result};
use crate::model::{Ack, Item, Lifecycle};
use crate::telemetry::metrics;
use crate::worker::{Registry, Worker};

/// Configuration for a queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How often the dispatcher checks the buffer for work.
    pub tick: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(DEFAULT_TICK_MS),
        }
    }
}

/// An item waiting in the buffer, together with the sending half of its
/// reply channel.
pub(crate) struct Pending {
    pub(crate) item: Item,
    pub(crate) reply: oneshot::Sender<Vec<Ack>>,
}

/// Per-topic lock serializing dispatch of items that share a topic.
pub(crate) type Lane = Arc<tokio::sync::Mutex<()>>;

pub(crate) struct State {
    pub(crate) lifecycle: Lifecycle,
    /// Bumped on every start so a ticker from an earlier run can tell it
    /// has been superseded.
    pub(crate) generation: u64,
    tick: Duration,
    pub(crate) buf: VecDeque<Pending>,
    pub(crate) registry: Registry,
    lineup: HashMap<String, Lane>,
    ticker: Option<Arc<Notify>>,
}

pub(crate) struct Shared {
    state: Mutex<State>,
}

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, State> {
        // No code path panics while holding the lock, but a poisoned buffer
        // is still structurally sound.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The lineup entry for `topic`, created on first use.
    pub(crate) fn lane(&self, topic: &str) -> Lane {
        let mut state = self.lock();
        if let Some(lane) = state.lineup.get(topic) {
            return Arc::clone(lane);
        }
        let lane = Lane::default();
        state.lineup.insert(topic.to_string(), Arc::clone(&lane));
        lane
    }

    /// Halt the ticker for good and drop every buffered reply sender.
    fn close(&self) {
        let abandoned = {
            let mut state = self.lock();
            state.lifecycle = Lifecycle::Stopped;
            state.generation += 1;
            if let Some(shutdown) = state.ticker.take() {
                shutdown.notify_one();
            }
            std::mem::take(&mut state.buf)
        };
        debug!(abandoned = abandoned.len(), "queue closed");
    }
}

/// Owned only by [`Queue`] clones. Dispatches in flight hold [`Shared`]
/// directly, so dropping the last handle closes the queue even while they
/// finish.
pub(crate) struct Handle {
    pub(crate) shared: Arc<Shared>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// In-memory work queue. Cheap to clone; every clone drives the same queue.
///
/// When the last handle is dropped the ticker exits and any receipts for
/// items still in the buffer resolve to [`Error::Closed`]. Items already
/// being dispatched still deliver their acks.
#[derive(Clone)]
pub struct Queue {
    handle: Arc<Handle>,
}

impl Queue {
    /// Create a queue that is not started yet, with the default tick.
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    pub fn with_config(config: QueueConfig) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                lifecycle: Lifecycle::Created,
                generation: 0,
                tick: config.tick,
                buf: VecDeque::new(),
                registry: Registry::default(),
                lineup: HashMap::new(),
                ticker: None,
            }),
        });
        Self {
            handle: Arc::new(Handle { shared }),
        }
    }

    /// Assign a worker to a topic.
    ///
    /// Takes effect for every dispatch of `topic` that has not yet looked up
    /// its workers, including items pushed before this call.
    pub fn register(&self, topic: impl Into<String>, worker: impl Worker) -> &Self {
        let topic = topic.into();
        let mut state = self.handle.shared.lock();
        state.registry.register(topic.clone(), Arc::new(worker));
        debug!(%topic, workers = state.registry.count(&topic), "worker registered");
        self
    }

    /// Queue work for every worker registered under `topic`.
    ///
    /// Never blocks. The returned receipt resolves to one batch of acks once
    /// the item has been dispatched; the batch is empty when no worker is
    /// registered for the topic.
    pub fn push(&self, topic: impl Into<String>, data: impl Into<serde_json::Value>) -> Receipt {
        let item = Item::new(topic, data.into());
        let (reply, rx) = oneshot::channel();
        let receipt = Receipt::new(item.id, item.topic.clone(), rx);

        metrics::items_pushed().add(1, &[KeyValue::new("topic", item.topic.clone())]);
        debug!(item = %item.id, topic = %item.topic, "item pushed");

        self.handle.shared.lock().buf.push_back(Pending { item, reply });
        receipt
    }

    /// Start dispatching. Work items are checked for on every tick.
    ///
    /// # Panics
    ///
    /// Panics if the queue is already active, if the tick is zero, or if
    /// called outside a tokio runtime. Use [`Queue::try_start`] to get those
    /// conditions back as errors.
    pub fn start(&self) -> &Self {
        match self.try_start() {
            Ok(queue) => queue,
            Err(e) => panic!("{e}"),
        }
    }

    /// Start dispatching, reporting misuse as an error.
    pub fn try_start(&self) -> Result<&Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let mut state = self.handle.shared.lock();
        if !state.lifecycle.can_transition_to(Lifecycle::Active) {
            return Err(Error::AlreadyActive);
        }
        if state.tick.is_zero() {
            return Err(Error::InvalidTick);
        }

        state.generation += 1;
        let shutdown = Arc::new(Notify::new());
        runtime.spawn(dispatch::run_ticker(
            Arc::downgrade(&self.handle),
            state.generation,
            state.tick,
            Arc::clone(&shutdown),
        ));
        state.ticker = Some(shutdown);

        info!(
            from = %state.lifecycle,
            generation = state.generation,
            tick = ?state.tick,
            pending = state.buf.len(),
            "queue started"
        );
        state.lifecycle = Lifecycle::Active;
        Ok(self)
    }

    /// Stop checking for work until [`Queue::start`] is called again.
    ///
    /// Dispatches already in flight run to completion and still deliver
    /// their acks. Items left in the buffer stay there. A no-op unless the
    /// queue is active.
    pub fn stop(&self) {
        let mut state = self.handle.shared.lock();
        if !state.lifecycle.can_transition_to(Lifecycle::Stopped) {
            return;
        }
        state.lifecycle = Lifecycle::Stopped;
        if let Some(shutdown) = state.ticker.take() {
            shutdown.notify_one();
        }
        info!(
            generation = state.generation,
            pending = state.buf.len(),
            "queue stopped"
        );
    }

    /// Change the dispatcher tick. Applies from the next start.
    pub fn set_tick(&self, tick: Duration) -> &Self {
        self.handle.shared.lock().tick = tick;
        self
    }

    pub fn tick(&self) -> Duration {
        self.handle.shared.lock().tick
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.handle.shared.lock().lifecycle
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle().is_active()
    }

    /// Number of items waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.handle.shared.lock().buf.len()
    }

    /// Number of workers registered for `topic`.
    pub fn worker_count(&self, topic: &str) -> usize {
        self.handle.shared.lock().registry.count(topic)
    }

    /// Topics with at least one registered worker, sorted.
    pub fn topics(&self) -> Vec<String> {
        self.handle.shared.lock().registry.topics()
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.handle.shared.lock();
        f.debug_struct("Queue")
            .field("lifecycle", &state.lifecycle)
            .field("tick", &state.tick)
            .field("pending", &state.buf.len())
            .field("topics", &state.registry.topics())
            .finish()
    }
}
