//! Dispatch engine: queue handle, ticker loop, fan-out/join, receipts.

mod dispatch;
pub mod queue;
pub mod receipt;

pub use queue::{Queue, QueueConfig};
pub use receipt::Receipt;
