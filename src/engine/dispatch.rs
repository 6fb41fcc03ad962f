//! Ticker loop and fan-out/join.
//!
//! The ticker pops at most one item per tick and hands it to its own task,
//! so a slow dispatch never delays the next tick or blocks a push.

use std::any::Any;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, warn};

use super::queue::{Handle, Pending, Shared};
use crate::model::{Ack, Item};
use crate::telemetry::dispatch::{record_fan_in, start_dispatch_span};
use crate::telemetry::metrics;
use crate::worker::WorkerRef;

/// Poll the buffer every `tick` until stopped, superseded by a newer start,
/// or the queue is dropped.
pub(crate) async fn run_ticker(
    handle: Weak<Handle>,
    generation: u64,
    tick: Duration,
    shutdown: Arc<Notify>,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = interval.tick() => {}
        }

        let Some(handle) = handle.upgrade() else {
            break;
        };

        let next = {
            let mut state = handle.shared.lock();
            if !state.lifecycle.is_active() || state.generation != generation {
                break;
            }
            state.buf.pop_front()
        };

        if let Some(pending) = next {
            tokio::spawn(dispatch(Arc::clone(&handle.shared), pending));
        }
    }

    debug!(generation, "ticker exited");
}

/// Run one item through its topic's lineup and deliver the acks.
async fn dispatch(shared: Arc<Shared>, pending: Pending) {
    let Pending { item, reply } = pending;
    let span = start_dispatch_span(&item.topic, &item.id);

    async move {
        let lane = shared.lane(&item.topic);
        let _turn = lane.lock().await;

        let started = Instant::now();
        let workers = shared.lock().registry.workers_for(&item.topic);
        let acks = fan_out(&item, workers).await;

        let failed = acks.iter().filter(|ack| !ack.is_ok()).count();
        record_fan_in(&tracing::Span::current(), acks.len(), failed);

        let topic = KeyValue::new("topic", item.topic.clone());
        metrics::items_dispatched().add(1, std::slice::from_ref(&topic));
        metrics::dispatch_duration_ms()
            .record(started.elapsed().as_secs_f64() * 1000.0, &[topic.clone()]);
        let acked = metrics::acks();
        acked.add(
            (acks.len() - failed) as u64,
            &[topic.clone(), KeyValue::new("outcome", "ok")],
        );
        acked.add(failed as u64, &[topic, KeyValue::new("outcome", "error")]);

        if reply.send(acks).is_err() {
            debug!(item = %item.id, "receipt dropped before delivery");
        }
    }
    .instrument(span)
    .await
}

/// Run every worker concurrently on its own copy of `item` and collect the
/// acks in completion order.
///
/// A panicking worker is reported through its ack; siblings are unaffected.
pub(crate) async fn fan_out(item: &Item, workers: Vec<WorkerRef>) -> Vec<Ack> {
    let mut running = JoinSet::new();
    for worker in workers {
        let item = item.clone();
        running.spawn(async move { worker.handle(item).await }.in_current_span());
    }

    let mut acks = Vec::with_capacity(running.len());
    while let Some(joined) = running.join_next().await {
        let ack = match joined {
            Ok(ack) => ack,
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                warn!(item = %item.id, topic = %item.topic, %message, "worker panicked");
                Ack::err(format!("worker panicked: {message}"))
            }
            Err(e) => Ack::err(format!("worker did not complete: {e}")),
        };
        acks.push(ack);
    }
    acks
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fan_out_without_workers_is_empty() {
        let acks = fan_out(&Item::new("t", json!(5)), Vec::new()).await;
        assert!(acks.is_empty());
    }

    #[tokio::test]
    async fn fan_out_contains_panics() {
        let ok: WorkerRef = Arc::new(|_item: Item| async { Ack::ok("fine") });
        let bad: WorkerRef = Arc::new(|item: Item| async move {
            if item.topic == "t" {
                panic!("boom");
            }
            Ack::default()
        });

        let acks = fan_out(&Item::new("t", json!(null)), vec![ok, bad]).await;
        assert_eq!(acks.len(), 2);
        assert_eq!(acks.iter().filter(|a| a.is_ok()).count(), 1);
        let failed = acks.iter().find(|a| !a.is_ok()).unwrap();
        assert_eq!(failed.error.as_deref(), Some("worker panicked: boom"));
    }

    #[test]
    fn panic_message_handles_owned_strings() {
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(42_u8)), "unknown panic payload");
    }
}
