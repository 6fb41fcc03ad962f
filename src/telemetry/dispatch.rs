//! Dispatch span helpers.
//!
//! One span per dispatched item, covering the wait for the topic's lineup,
//! the fan-out and the join.

use tracing::Span;

use crate::model::ItemId;

/// Start a span for one item's fan-out/join.
///
/// The `dispatch.workers` and `dispatch.failed` fields are declared empty
/// and filled in by [`record_fan_in`].
pub fn start_dispatch_span(topic: &str, item_id: &ItemId) -> Span {
    tracing::info_span!(
        "dispatch.execute",
        "dispatch.topic" = topic,
        "dispatch.item" = %item_id,
        "dispatch.workers" = tracing::field::Empty,
        "dispatch.failed" = tracing::field::Empty,
    )
}

/// Record how many workers answered and how many of them failed, and emit
/// a `fan_in` event scoped to the span.
pub fn record_fan_in(span: &Span, workers: usize, failed: usize) {
    span.record("dispatch.workers", workers as u64);
    span.record("dispatch.failed", failed as u64);
    span.in_scope(|| {
        tracing::debug!(workers, failed, "fan_in");
    });
}
