//! cartflow CLI
//!
//! Runs the reservation pipeline in-process against the simulated inventory
//! service and prints where every item ended up.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use cartflow_core::app::{AppConfig, CartService, ReservationWorker, WorkerConfig, WorkerGroup};
use cartflow_core::impls::{InMemoryItemStore, InMemoryJobQueue, SimulatedReservationProvider};
use cartflow_core::observability::init_tracing;
use cartflow_core::ports::{JobQueue, SystemClock, UlidGenerator};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cartflow")]
#[command(version)]
#[command(about = "Asynchronous cart reservation pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add items to the cart and run workers until every job settles
    Run {
        /// Items as `name:quantity` (e.g. `laptop:2`, `phone:1`)
        #[arg(required = true, value_parser = parse_item)]
        items: Vec<(String, u32)>,

        /// After the first settle, move failed jobs back to pending and run
        /// them again with `--retry-attempts` more attempts each
        #[arg(long)]
        retry_failed: bool,

        /// Extra attempts per job granted to the pass after `--retry-failed`
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        retry_attempts: u32,

        /// Give up waiting after this many seconds (per pass)
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
    /// Print the effective configuration
    Config,
}

fn parse_item(raw: &str) -> Result<(String, u32), String> {
    let (name, quantity) = raw
        .rsplit_once(':')
        .ok_or_else(|| format!("expected name:quantity, got {raw:?}"))?;
    let quantity = quantity
        .trim()
        .parse()
        .map_err(|_| format!("invalid quantity in {raw:?}"))?;
    Ok((name.trim().to_string(), quantity))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("loading configuration")?;
    init_tracing(&config.log_filter);

    match cli.command {
        Commands::Run {
            items,
            retry_failed,
            retry_attempts,
            timeout_secs,
        } => {
            let retry = retry_failed.then_some(retry_attempts);
            run(config, items, retry, Duration::from_secs(timeout_secs)).await
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Everything one `run` needs to spawn worker passes over a shared queue.
struct Pipeline {
    queue: Arc<InMemoryJobQueue>,
    store: Arc<InMemoryItemStore>,
    provider: Arc<SimulatedReservationProvider>,
    ids: Arc<UlidGenerator<SystemClock>>,
}

impl Pipeline {
    /// Run `concurrency` workers under `worker_config` until the queue is idle.
    async fn pass(&self, worker_config: WorkerConfig, timeout: Duration) -> Result<()> {
        let concurrency = worker_config.concurrency;
        let worker = ReservationWorker::new(
            self.queue.clone(),
            self.store.clone(),
            self.provider.clone(),
            worker_config,
        )
        .with_id_generator(self.ids.clone());
        let group = WorkerGroup::spawn(concurrency, Arc::new(worker));

        let outcome = tokio::time::timeout(timeout, wait_until_idle(self.queue.as_ref())).await;
        group.shutdown_and_join().await;

        match outcome {
            Ok(result) => result,
            Err(_) => bail!("jobs did not settle within {}s", timeout.as_secs()),
        }
    }
}

async fn run(
    config: AppConfig,
    items: Vec<(String, u32)>,
    retry_attempts: Option<u32>,
    timeout: Duration,
) -> Result<()> {
    let pipeline = Pipeline {
        queue: Arc::new(InMemoryJobQueue::new()),
        store: Arc::new(InMemoryItemStore::new()),
        provider: Arc::new(SimulatedReservationProvider::new(&config.provider)),
        ids: Arc::new(UlidGenerator::new(SystemClock)),
    };

    let cart = CartService::new(
        pipeline.store.clone(),
        pipeline.queue.clone(),
        pipeline.ids.clone(),
    );
    for (name, quantity) in &items {
        cart.add_item_to_cart(name, *quantity)
            .await
            .with_context(|| format!("adding {name}:{quantity}"))?;
    }

    pipeline.pass(config.worker.clone(), timeout).await?;

    if let Some(extra) = retry_attempts
        && pipeline.queue.retry_failed_jobs().await? > 0
    {
        let retry_config = config.worker.with_extra_attempts(extra);
        tracing::info!(
            max_attempts = retry_config.max_attempts,
            "running failed jobs again"
        );
        pipeline.pass(retry_config, timeout).await?;
    }

    let counts = pipeline.queue.counts().await?;
    tracing::info!(
        completed = counts.completed,
        failed = counts.failed,
        "all jobs settled"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&cart.list_cart_items().await?)?
    );
    Ok(())
}

async fn wait_until_idle(queue: &dyn JobQueue) -> Result<()> {
    loop {
        if queue.counts().await?.is_idle() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_quantity() {
        assert_eq!(parse_item("laptop:2").unwrap(), ("laptop".to_string(), 2));
        assert_eq!(
            parse_item(" usb:c cable : 3").unwrap(),
            ("usb:c cable".to_string(), 3)
        );
    }

    #[test]
    fn rejects_malformed_items() {
        assert!(parse_item("laptop").is_err());
        assert!(parse_item("laptop:two").is_err());
        assert!(parse_item("laptop:-1").is_err());
    }

    #[test]
    fn retry_flags_parse() {
        let cli = Cli::try_parse_from([
            "cartflow",
            "run",
            "laptop:1",
            "--retry-failed",
            "--retry-attempts",
            "3",
        ])
        .unwrap();
        let Commands::Run {
            retry_failed,
            retry_attempts,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert!(retry_failed);
        assert_eq!(retry_attempts, 3);

        assert!(
            Cli::try_parse_from(["cartflow", "run", "laptop:1", "--retry-attempts", "0"]).is_err()
        );
    }
}
