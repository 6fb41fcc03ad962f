//! Metric instrument factories for expresslane.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"expresslane"` meter; with
//! no provider installed they are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for expresslane instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("expresslane")
}

/// Counter: number of items pushed.
/// Labels: `topic`.
pub fn items_pushed() -> Counter<u64> {
    meter()
        .u64_counter("expresslane.items.pushed")
        .with_description("Number of items pushed onto the queue")
        .build()
}

/// Counter: number of items taken off the buffer and fanned out.
/// Labels: `topic`.
pub fn items_dispatched() -> Counter<u64> {
    meter()
        .u64_counter("expresslane.items.dispatched")
        .with_description("Number of items dispatched to their workers")
        .build()
}

/// Counter: acks produced by workers.
/// Labels: `topic`, `outcome` ("ok" | "error").
pub fn acks() -> Counter<u64> {
    meter()
        .u64_counter("expresslane.acks")
        .with_description("Number of worker acks")
        .build()
}

/// Histogram: fan-out/join duration in milliseconds, excluding the wait
/// for the topic's lineup.
/// Labels: `topic`.
pub fn dispatch_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("expresslane.dispatch.duration_ms")
        .with_description("Fan-out/join duration in milliseconds")
        .with_unit("ms")
        .build()
}
