//! # Example: daemons
//!
//! Three daemons sharing one worker pool over an in-memory broker.
//!
//! - `number_printer` enqueues a trivial task every 100ms;
//! - `price_feed` publishes a synthetic price every 250ms;
//! - `price_consumer` turns every received price into a task.
//!
//! ## Flow
//! ```text
//! Master::builder()
//!     ├─► with_subscribe_fn(broker.subscribe_fn())
//!     ├─► with_publisher(broker.publisher("prices"))
//!     └─► with_subscribers([LogWriter])
//! add_daemon × 3 ──► start_daemons()
//!     ...
//! Ctrl-C ──► stop_daemons() ──► per-daemon stats + latency stats
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example daemons
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use daemonic::{
    Actor, Config, Daemon, DaemonContext, DaemonError, LogWriter, Master, MemoryBroker,
    Subscribe, wait_for_shutdown_signal,
};
use futures::StreamExt;
use tracing::{info, warn};

const PRICES: &str = "prices";

/// Prints a growing counter on a worker.
struct NumberPrinter;

#[async_trait]
impl Daemon for NumberPrinter {
    fn name(&self) -> &str {
        "number_printer"
    }

    async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        let mut n = 0u64;
        loop {
            tokio::select! {
                _ = ctx.shutdown_requested() => return Ok(()),
                _ = ticker.tick() => {
                    n += 1;
                    ctx.process(Actor::new(move || println!("number: {n}"))).await?;
                }
            }
        }
    }
}

/// Publishes a slowly drifting price.
struct PriceFeed;

#[async_trait]
impl Daemon for PriceFeed {
    fn name(&self) -> &str {
        "price_feed"
    }

    async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
        let publisher = Arc::clone(ctx.publisher()?);
        let mut ticker = tokio::time::interval(Duration::from_millis(250));
        let mut price = 100.0_f64;
        let mut step = 0u32;
        loop {
            tokio::select! {
                _ = ctx.shutdown_requested() => break,
                _ = ticker.tick() => {
                    step = step.wrapping_add(1);
                    price += if step % 3 == 0 { -0.75 } else { 0.5 };
                    publisher.publish(format!("{price:.2}").as_bytes()).await?;
                }
            }
        }
        Ok(())
    }

    async fn shutdown(&self, ctx: &DaemonContext) -> Result<(), DaemonError> {
        ctx.publisher()?.close().await?;
        Ok(())
    }
}

/// Consumes the price topic and reports each price on a worker.
struct PriceConsumer;

#[async_trait]
impl Daemon for PriceConsumer {
    fn name(&self) -> &str {
        "price_consumer"
    }

    async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
        let mut streamer = ctx.subscribe("demo", PRICES)?;
        {
            let mut messages = streamer.messages();
            loop {
                let msg = tokio::select! {
                    _ = ctx.shutdown_requested() => break,
                    msg = messages.next() => msg,
                };
                match msg {
                    Some(Ok(payload)) => {
                        let price = String::from_utf8_lossy(&payload).into_owned();
                        ctx.process(Actor::new(move || println!("price update: {price}")))
                            .await?;
                    }
                    Some(Err(e)) => warn!(error = %e, "skipping price message"),
                    None => break,
                }
            }
        }
        streamer.close().await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let broker = MemoryBroker::default();
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let master = Master::builder(Config::default())
        .with_subscribers(subs)
        .with_subscribe_fn(broker.subscribe_fn())
        .with_publisher(Arc::new(broker.publisher(PRICES)))
        .build();

    master.add_daemon(NumberPrinter)?;
    master.add_daemon(PriceConsumer)?;
    master.add_daemon(PriceFeed)?;
    master.start_daemons()?;

    wait_for_shutdown_signal().await?;

    let report = master.stop_daemons().await?;
    for (name, snapshot) in &report.daemons {
        info!(daemon = %name, samples = snapshot.count, "final");
    }
    Ok(())
}
