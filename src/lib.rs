//! # expresslane
//!
//! In-memory, topic-addressed work queue for small bursts of work.
//!
//! Producers push items under a topic; every worker registered for that
//! topic runs concurrently on the item, and the producer gets all of their
//! acks back as one batch through a [`Receipt`]. Items sharing a topic are
//! dispatched one at a time ("lineup"); items on different topics overlap
//! freely.
//!
//! ```rust,no_run
//! # async fn demo() -> expresslane::error::Result<()> {
//! use expresslane::{Ack, Item, Queue};
//!
//! let q = Queue::new();
//! q.register("t", |_item: Item| async { Ack::ok("w1") })
//!     .register("t", |_item: Item| async { Ack::ok("w2") });
//! q.start();
//!
//! let acks = q.push("t", 5).await?;
//! assert_eq!(acks.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod telemetry;
pub mod worker;

pub use engine::{Queue, QueueConfig, Receipt};
pub use error::{Error, Result};
pub use model::{Ack, Item, ItemId, Lifecycle};
pub use worker::Worker;
