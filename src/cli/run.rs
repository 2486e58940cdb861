//! The `run` command

use super::RunArgs;
use crate::sim::SimulatedCaller;

use anyhow::{Context, Result};
use loadgen_core::{ChannelConfig, Generator, ResultCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Drive the simulated target until the run duration elapses or Ctrl+C
pub async fn run(args: RunArgs) -> Result<()> {
    let caller = Arc::new(SimulatedCaller::new(
        args.latency,
        args.jitter,
        args.failure_rate,
    ));
    let (result_tx, mut result_rx) = ChannelConfig::default()
        .with_results_buffer(args.results_buffer)
        .result_channel();

    let mut builder = Generator::builder()
        .caller(caller)
        .call_timeout(args.timeout)
        .rate_per_second(args.lps)
        .run_duration(args.duration)
        .result_tx(result_tx);
    if let Some(concurrency) = args.concurrency {
        builder = builder.concurrency(concurrency);
    }
    let generator = Arc::new(builder.build().context("invalid load parameters")?);

    let started = Instant::now();
    generator.start();

    let signal_handle = {
        let generator = Arc::clone(&generator);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, stopping load generator...");
                    generator.stop().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        })
    };

    let mut tally: HashMap<ResultCode, u64> = HashMap::new();
    while let Some(result) = result_rx.recv().await {
        if args.print_results {
            println!(
                "{}",
                serde_json::to_string(&result).context("failed to encode result")?
            );
        }
        *tally.entry(result.code).or_default() += 1;
    }

    generator.stopped().await;
    signal_handle.abort();

    let elapsed = started.elapsed();
    let admitted = generator.call_count();
    tracing::info!(
        elapsed_secs = elapsed.as_secs_f64(),
        admitted,
        "Load run completed"
    );

    println!("admitted calls: {admitted}");
    println!("elapsed: {}", humantime::format_duration(round_millis(elapsed)));
    for code in ResultCode::ALL {
        if let Some(count) = tally.get(&code) {
            println!("  {:>4} {:<22} {count}", code.code(), code.plain());
        }
    }
    Ok(())
}

fn round_millis(d: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(d.as_millis() as u64)
}
