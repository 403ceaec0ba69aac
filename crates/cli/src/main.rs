mod cli;
mod config;
mod demo;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use workerpool_core::config::load_dotenv;
use workerpool_scheduler::Scheduler;

use crate::cli::CliArgs;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let config = config::resolve(&args)?;
    config.log_summary();

    let scheduler = Scheduler::new(config).context("failed to build scheduler")?;
    scheduler.start().context("failed to start worker threads")?;

    demo::submit_script(&scheduler, Duration::from_millis(args.task_ms))
        .context("failed to submit demo tasks")?;

    if !scheduler.wait_idle(Duration::from_secs(args.run_secs)) {
        warn!(
            pending = scheduler.pending_tasks(),
            in_flight = scheduler.in_flight_tasks(),
            "Run time elapsed before the pool drained"
        );
    }

    scheduler.stop();
    scheduler.join();

    let metrics = scheduler.metrics();
    if args.json_metrics {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        info!(
            completed = metrics.total_completed(),
            failed = metrics.total_failed(),
            stolen = metrics.total_stolen(),
            pending = metrics.total_pending,
            "Demo finished"
        );
    }

    Ok(())
}
