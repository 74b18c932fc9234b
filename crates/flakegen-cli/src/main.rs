#![doc = include_str!("../README.md")]

mod config;
mod retry;
mod telemetry;

use anyhow::{Context, anyhow, bail};
use clap::Parser;
use config::{CliArgs, RunConfig};
use flakegen::{FlakeId, Generator, SystemClock, SystemInterfaces, TimeSource};
use retry::generate_with_retry;
use std::{collections::HashSet, thread, time::Instant};
use telemetry::init_telemetry;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    init_telemetry()?;

    if let Some(id) = config.decompose {
        print_components(id);
        return Ok(());
    }

    let generator = Generator::from_config(&config.generator, SystemClock, &SystemInterfaces)
        .context("failed to create generator")?;
    info!(
        node_id = generator.node_id(),
        spin = ?config.generator.spin,
        overflow_timeout_ms = ?config.generator.overflow_timeout_ms,
        "generator ready"
    );

    for _ in 0..config.count {
        let id = generate_with_retry(&generator, config.retry).context("failed to generate id")?;
        println!("{id}");
    }

    if config.concurrent > 0 {
        run_concurrent(&generator, &config)?;
    }

    Ok(())
}

/// Splits `config.concurrent` generations across `config.threads` workers
/// sharing one generator, then checks that every ID is distinct.
fn run_concurrent<T>(generator: &Generator<T>, config: &RunConfig) -> anyhow::Result<()>
where
    T: TimeSource + Sync,
{
    let per_thread = config.concurrent.div_ceil(config.threads);
    let start = Instant::now();

    let batches = thread::scope(|s| {
        let handles: Vec<_> = (0..config.threads)
            .map(|worker| {
                let quota = config
                    .concurrent
                    .saturating_sub(worker * per_thread)
                    .min(per_thread);
                s.spawn(move || {
                    (0..quota)
                        .map(|_| generate_with_retry(generator, config.retry))
                        .collect::<flakegen::Result<Vec<FlakeId>>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| anyhow!("worker thread panicked"))?
                    .context("failed to generate id")
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    let elapsed = start.elapsed();
    let total: usize = batches.iter().map(Vec::len).sum();
    let unique: HashSet<FlakeId> = batches.iter().flatten().copied().collect();
    if unique.len() != total {
        bail!("{} duplicate ids out of {total}", total - unique.len());
    }

    let first = unique.iter().min();
    let last = unique.iter().max();
    info!(
        total,
        threads = config.threads,
        elapsed_ms = elapsed.as_millis() as u64,
        first = ?first,
        last = ?last,
        "concurrent generation finished, all ids unique"
    );
    Ok(())
}

fn print_components(id: FlakeId) {
    println!("id        : {id}");
    println!("padded    : {}", id.to_padded_string());
    println!("timestamp : {} (unix ms {})", id.timestamp(), id.unix_millis());
    println!("node_id   : {}", id.node_id());
    println!("sequence  : {}", id.sequence());
}
