//! Integration tests for the queue lifecycle: start, stop, restart.

use std::time::Duration;

use expresslane::{Ack, Error, Item, Lifecycle, Queue, QueueConfig};
use tokio::time::Instant;

const WAIT: Duration = Duration::from_secs(5);

fn fast_queue() -> Queue {
    Queue::with_config(QueueConfig {
        tick: Duration::from_millis(5),
    })
}

/// Poll until the buffer is empty or `WAIT` runs out.
async fn drained(q: &Queue) {
    let deadline = Instant::now() + WAIT;
    while q.pending() > 0 {
        assert!(Instant::now() < deadline, "buffer never drained");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[test]
fn new_queue_is_created_with_default_tick() {
    let q = Queue::new();
    assert_eq!(q.lifecycle(), Lifecycle::Created);
    assert!(!q.is_active());
    assert_eq!(q.tick(), Duration::from_millis(100));
}

#[tokio::test]
async fn a_queue_can_be_stopped() {
    let q = Queue::new();
    q.start();
    assert!(q.is_active());
    assert_eq!(q.lifecycle(), Lifecycle::Active);

    q.stop();
    assert!(!q.is_active());
    assert_eq!(q.lifecycle(), Lifecycle::Stopped);
}

#[tokio::test]
#[should_panic(expected = "queue is already active")]
async fn cannot_start_twice() {
    let q = Queue::new();
    q.start();
    q.start();
}

#[tokio::test]
async fn try_start_reports_double_start() {
    let q = Queue::new();
    q.try_start().unwrap();
    assert!(matches!(q.try_start(), Err(Error::AlreadyActive)));
    assert!(q.is_active());
}

#[test]
fn try_start_needs_a_runtime() {
    let q = Queue::new();
    assert!(matches!(q.try_start(), Err(Error::NoRuntime)));
    assert_eq!(q.lifecycle(), Lifecycle::Created);
}

#[tokio::test]
async fn zero_tick_is_rejected() {
    let q = Queue::new();
    q.set_tick(Duration::ZERO);
    assert!(matches!(q.try_start(), Err(Error::InvalidTick)));
    assert_eq!(q.lifecycle(), Lifecycle::Created);
}

#[tokio::test]
async fn stop_is_a_noop_unless_active() {
    let q = Queue::new();
    q.stop();
    assert_eq!(q.lifecycle(), Lifecycle::Created);

    q.start();
    q.stop();
    q.stop();
    assert_eq!(q.lifecycle(), Lifecycle::Stopped);
}

#[tokio::test]
async fn stopped_queue_does_not_dispatch() {
    let q = fast_queue();
    q.start();
    q.stop();

    let mut receipt = q.push("t", 1);
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(q.pending(), 1);
    assert!(receipt.try_recv().unwrap().is_none());
}

#[tokio::test]
async fn restart_resumes_draining_the_buffer() {
    let q = fast_queue();
    q.register("t", |_item: Item| async { Ack::ok("resumed") });
    q.start();
    q.stop();

    let first = q.push("t", 1);
    let second = q.push("t", 2);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(q.pending(), 2);

    q.start();
    assert_eq!(first.wait_timeout(WAIT).await.unwrap(), vec![Ack::ok("resumed")]);
    assert_eq!(second.wait_timeout(WAIT).await.unwrap(), vec![Ack::ok("resumed")]);
    assert_eq!(q.pending(), 0);
}

#[tokio::test]
async fn queue_can_cycle_many_times() {
    let q = fast_queue();
    q.register("t", |item: Item| async move { Ack::ok(item.data) });

    for round in 0..5 {
        q.start();
        let acks = q.push("t", round).wait_timeout(WAIT).await.unwrap();
        assert_eq!(acks, vec![Ack::ok(round)]);
        q.stop();
    }
    assert_eq!(q.lifecycle(), Lifecycle::Stopped);
}

#[tokio::test]
async fn stop_lets_in_flight_dispatch_finish() {
    let q = fast_queue();
    q.register("slow", |_item: Item| async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ack::ok("finished")
    });
    q.start();

    let receipt = q.push("slow", 0);
    drained(&q).await;
    q.stop();

    assert_eq!(receipt.wait_timeout(WAIT).await.unwrap(), vec![Ack::ok("finished")]);
}

#[tokio::test]
async fn new_tick_applies_on_next_start() {
    let q = fast_queue();
    q.start();
    q.set_tick(Duration::from_millis(10));
    assert_eq!(q.tick(), Duration::from_millis(10));
    q.stop();

    q.start();
    let acks = q.push("t", 0).wait_timeout(WAIT).await.unwrap();
    assert!(acks.is_empty());
}
