//! Command-line interface and harness configuration.

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Compare running times and memory usage of a set of compressors.
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Input files to use for comparison
    #[clap(value_name = "FILE", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// TOML suite description to execute (defaults to the built-in suite)
    #[clap(short, long)]
    pub suite: Option<PathBuf>,

    /// Timing iterations per measurement
    #[clap(short = 'n', long, default_value_t = crate::defaults::ITERATIONS)]
    pub iterations: usize,

    /// Output format
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Don't measure memory
    #[clap(long)]
    pub no_memory: bool,

    /// Only compress, don't decompress or verify
    #[clap(long)]
    pub no_decompress: bool,

    /// Don't print the captured tool output when done
    #[clap(long)]
    pub no_log: bool,

    /// Directory for temporary files (defaults to the system temp dir)
    #[clap(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,
}

/// Available report formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable fixed-width table on standard output.
    #[clap(name = "table")]
    Table,
    /// One self-describing JSON document on standard output.
    #[clap(name = "json")]
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Resolved configuration for one harness run.
///
/// The CLI's negative flags are folded into positive fields here so the
/// orchestrator never reasons about double negatives.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    pub files: Vec<PathBuf>,
    pub iterations: usize,
    pub format: OutputFormat,
    pub measure_memory: bool,
    pub decompress: bool,
    pub dump_log: bool,
    pub temp_dir: PathBuf,
}

impl From<&Args> for HarnessConfig {
    fn from(args: &Args) -> Self {
        Self {
            files: args.files.clone(),
            // At least one timing run is always required.
            iterations: args.iterations.max(1),
            format: args.format,
            measure_memory: !args.no_memory,
            decompress: !args.no_decompress,
            dump_log: !args.no_log,
            temp_dir: args
                .temp_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        }
    }
}
