//! expresslane demo: drives a queue from timers for a fixed time.

use std::time::Duration;

use clap::{Parser, Subcommand};
use expresslane::config::Config;
use expresslane::telemetry::init_telemetry;
use expresslane::{Ack, Item, Queue};
use tracing::info;

#[derive(Parser)]
#[command(name = "expresslane", about = "In-memory work queue demos")]
struct Cli {
    /// How long to run before stopping the queue
    #[arg(long, global = true, default_value_t = 5)]
    seconds: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Two topics fed by independent timers; nobody waits on the replies
    Async,
    /// One slow worker; each round pushes two items and waits for both
    Blocking {
        /// How long the worker sleeps per item, in milliseconds
        #[arg(long, default_value_t = 1000)]
        work_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(&config)?;

    let queue = Queue::with_config(config.queue_config());
    let run_for = Duration::from_secs(cli.seconds);

    match cli.command {
        Command::Async => cmd_async(&queue, run_for).await,
        Command::Blocking { work_ms } => {
            cmd_blocking(&queue, run_for, Duration::from_millis(work_ms)).await
        }
    }

    queue.stop();
    info!(pending = queue.pending(), "demo finished");
    Ok(())
}

async fn cmd_async(queue: &Queue, run_for: Duration) {
    queue.start();

    queue
        .register("seconds", |item: Item| async move {
            info!(topic = %item.topic, data = %item.data, "handled");
            Ack::default()
        })
        .register("milliseconds", |item: Item| async move {
            info!(topic = %item.topic, data = %item.data, "handled");
            Ack::default()
        });

    let fast = feed(queue.clone(), "milliseconds", Duration::from_millis(100));
    let slow = feed(queue.clone(), "seconds", Duration::from_secs(1));

    tokio::time::sleep(run_for).await;
    fast.abort();
    slow.abort();
}

/// Push a timestamp under `topic` every `period`, ignoring the replies.
fn feed(queue: Queue, topic: &'static str, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        loop {
            timer.tick().await;
            drop(queue.push(topic, chrono::Utc::now().to_rfc3339()));
        }
    })
}

async fn cmd_blocking(queue: &Queue, run_for: Duration, work: Duration) {
    queue.start();

    queue.register("milliseconds", move |item: Item| async move {
        info!("worker is sleeping....");
        tokio::time::sleep(work).await;
        info!(topic = %item.topic, data = %item.data, "handled");
        Ack::ok(item.id.to_string())
    });

    let rounds = async {
        let mut timer = tokio::time::interval(Duration::from_millis(100));
        loop {
            timer.tick().await;
            let stamp = chrono::Utc::now().to_rfc3339();
            let first = queue.push("milliseconds", stamp.clone());
            let second = queue.push("milliseconds", stamp);

            info!("blocking until workers are done");
            let (first, second) = tokio::join!(first, second);
            match (first, second) {
                (Ok(first), Ok(second)) => {
                    info!(?first, "response from workers (1)");
                    info!(?second, "response from workers (2)");
                }
                (first, second) => {
                    tracing::error!(?first, ?second, "round failed");
                    return;
                }
            }
        }
    };

    if tokio::time::timeout(run_for, rounds).await.is_err() {
        info!("time is up");
    }
}
