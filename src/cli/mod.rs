//! CLI argument parsing and command dispatch

mod run;

use clap::{Parser, Subcommand};
use loadgen_log::Level;
use std::time::Duration;

pub use run::run;

#[derive(Parser)]
#[command(name = "loadgen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Prefix log lines with their call site
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Lowest level written to the console (trace, debug, info, warn, error)
    #[arg(long = "log-level", global = true, default_value = "info")]
    pub log_level: Level,

    /// Log engine to write to; may be repeated
    #[arg(long = "log-engine", global = true, default_value = "console")]
    pub log_engines: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate load against the simulated target
    Run(RunArgs),
    /// List the available log engines
    Engines,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Per-call timeout
    #[arg(long, value_parser = humantime::parse_duration, default_value = "50ms")]
    pub timeout: Duration,

    /// Loads per second; 0 admits as fast as tickets allow
    #[arg(long, default_value_t = 100)]
    pub lps: u32,

    /// How long to generate load
    #[arg(long, value_parser = humantime::parse_duration, default_value = "5s")]
    pub duration: Duration,

    /// Maximum in-flight calls; derived from timeout and rate when omitted
    #[arg(long)]
    pub concurrency: Option<u32>,

    /// Mean latency of the simulated target
    #[arg(long, value_parser = humantime::parse_duration, default_value = "10ms")]
    pub latency: Duration,

    /// Latency spread of the simulated target
    #[arg(long, value_parser = humantime::parse_duration, default_value = "5ms")]
    pub jitter: Duration,

    /// Probability of a transport failure per call
    #[arg(long, value_parser = parse_probability, default_value_t = 0.0)]
    pub failure_rate: f64,

    /// Capacity of the result stream
    #[arg(long, default_value_t = 10_000)]
    pub results_buffer: usize,

    /// Print every result as a JSON line
    #[arg(long)]
    pub print_results: bool,
}

/// Parse a probability in `0.0..=1.0`
fn parse_probability(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e: std::num::ParseFloatError| e.to_string())?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not a probability between 0 and 1"))
    }
}
