//! Blocking cache simulator CLI.
//!
//! This binary drives the cache model from files. It performs:
//! 1. **Run:** Load a JSON config and a JSON access trace, simulate to completion,
//!    and print cache statistics (plain text or JSON).
//! 2. **Defaults:** Print the built-in configuration as JSON, as a starting point
//!    for a config file.
//!
//! Logging goes through `tracing`; set `RUST_LOG` (e.g. `RUST_LOG=cachesim_core=debug`)
//! to see the cache's state transitions.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cachesim_core::config::Config;
use cachesim_core::sim::loader;
use cachesim_core::sim::system::RunSummary;
use cachesim_core::stats::StatsSnapshot;
use cachesim_core::System;

#[derive(Parser, Debug)]
#[command(
    name = "cachesim",
    author,
    version,
    about = "Blocking write-back cache simulator",
    long_about = "Replay a JSON access trace through a blocking cache in front of a fixed-latency memory.\n\nExamples:\n  cachesim defaults > cache.json\n  cachesim run --config cache.json --trace trace.json\n  RUST_LOG=cachesim_core=debug cachesim run --trace trace.json --json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace and print statistics.
    Run {
        /// JSON configuration (built-in defaults when omitted).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON access trace.
        #[arg(short, long)]
        trace: PathBuf,

        /// Replacement policy seed (overrides the config).
        #[arg(long)]
        seed: Option<u64>,

        /// Print the summary and statistics as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as JSON.
    Defaults,
}

/// Machine-readable run report.
#[derive(Serialize)]
struct Report {
    summary: RunSummary,
    stats: StatsSnapshot,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            trace,
            seed,
            json,
        } => cmd_run(config.as_deref(), &trace, seed, json),
        Commands::Defaults => cmd_defaults(),
    }
}

/// Loads config and trace, runs to completion, and reports.
///
/// Exits with code 1 on unreadable input or a protocol violation.
fn cmd_run(config_path: Option<&Path>, trace_path: &Path, seed: Option<u64>, json: bool) {
    let mut config = match config_path {
        Some(path) => Config::from_file(path).unwrap_or_else(|e| {
            eprintln!("Error reading config {}: {e}", path.display());
            process::exit(1);
        }),
        None => Config::default(),
    };
    if let Some(seed) = seed {
        config.sim.seed = seed;
    }

    let trace = loader::load_trace(trace_path).unwrap_or_else(|e| {
        eprintln!("Error reading trace {}: {e}", trace_path.display());
        process::exit(1);
    });

    if !json {
        println!("{}", describe(&config));
        println!("[*] Trace: {} ({} ops)", trace_path.display(), trace.len());
        println!();
    }

    let mut system = System::new(&config, trace).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    let summary = match system.run() {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("\n[!] FATAL: {e} at tick {}", system.now());
            system.cache().stats().print(system.cache().name());
            process::exit(1);
        }
    };

    if json {
        let report = Report {
            summary,
            stats: system.cache().stats().snapshot(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error encoding report: {e}");
                process::exit(1);
            }
        }
        return;
    }

    println!(
        "[*] Finished at tick {}: {} completed, {} pending",
        summary.end_tick, summary.completed, summary.pending
    );
    system.cache().stats().print(system.cache().name());
}

/// One-line summary of the simulated hardware.
fn describe(config: &Config) -> String {
    format!(
        "Configuration: {} B cache ({} x {} B blocks), {} port(s), memory latency {} ticks",
        config.cache.size_bytes,
        config.cache.capacity(),
        config.cache.block_size,
        config.cache.cpu_side_ports,
        config.memory.latency
    )
}

/// Prints `Config::default()` as pretty JSON.
fn cmd_defaults() {
    match serde_json::to_string_pretty(&Config::default()) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error encoding config: {e}");
            process::exit(1);
        }
    }
}
