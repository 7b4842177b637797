//! # asl-worker — Binary Entry Point
//!
//! `run` polls the queue and applies change requests until interrupted,
//! backing off while the queue is unreachable.
//! `expire` runs the expiry sweep once and exits; scheduling it is left to
//! the platform.

use std::time::Duration;

use anyhow::Context as _;
use chrono::Utc;
use clap::Parser;

use asl_resolvers::expiry;
use asl_store::{PgStore, Store, Transaction};
use asl_worker::blob::HttpBlobStore;
use asl_worker::poll::Backoff;
use asl_worker::queue::PgQueue;
use asl_worker::{Processor, WorkerConfig};

const MAX_CONNECTIONS: u32 = 5;
const MIN_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Licence lifecycle worker.
#[derive(Parser, Debug)]
#[command(name = "asl-worker", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Poll the queue and apply change requests.
    Run(RunArgs),
    /// Mark active licences past their expiry date as expired.
    Expire,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Settle a single batch and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env().context("loading configuration")?;
    tracing::debug!(?config, "configuration loaded");

    if let Some(addr) = config.metrics_addr {
        asl_worker::metrics::install(addr).context("installing metrics exporter")?;
    }

    let store = PgStore::connect(&config.database_url, MAX_CONNECTIONS)
        .await
        .context("connecting to database")?;

    match cli.command {
        Commands::Run(args) => run(config, store, args).await,
        Commands::Expire => expire(store).await,
    }
}

async fn run(config: WorkerConfig, store: PgStore, args: RunArgs) -> anyhow::Result<()> {
    let blobs = HttpBlobStore::new(config.require_blob_base_url()?.clone(), config.blob_timeout)?;
    let queue = PgQueue::new(store.pool().clone(), config.visibility_timeout);
    let processor = Processor::new(store, blobs, config.secure_payload_key.clone());

    if args.once {
        let received = processor.drain(&queue, config.poll_batch_size).await?;
        tracing::info!(received, "single batch settled");
        return Ok(());
    }

    tracing::info!(batch = config.poll_batch_size, "worker polling");
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut backoff = Backoff::new(config.poll_interval.max(MIN_BACKOFF), MAX_BACKOFF);
    loop {
        let pause = match processor.drain(&queue, config.poll_batch_size).await {
            Ok(received) => {
                backoff.reset();
                if received == 0 {
                    config.poll_interval
                } else {
                    Duration::ZERO
                }
            }
            Err(err) => {
                let delay = backoff.failure();
                tracing::error!(error = %err, failures = backoff.failures(), retry_in = ?delay, "queue unavailable");
                delay
            }
        };
        tokio::select! {
            biased;
            signal = &mut shutdown => {
                signal.context("listening for shutdown signal")?;
                tracing::info!("shutdown requested");
                break;
            }
            _ = tokio::time::sleep(pause) => {}
        }
    }
    Ok(())
}

async fn expire(store: PgStore) -> anyhow::Result<()> {
    let mut tx = store.begin().await?;
    let expired = expiry::expire(&mut tx, Utc::now()).await?;
    tx.commit().await?;
    tracing::info!(count = expired.len(), "expiry sweep committed");
    Ok(())
}
