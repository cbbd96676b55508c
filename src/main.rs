//! Entry point for the compress-bench harness.
//!
//! Wires together the pieces in fail-fast order: logging, argument
//! parsing, input validation, suite loading, sink selection, then the
//! benchmark run itself. The sink is flushed even when the run aborts,
//! so already-collected results are never lost.

use anyhow::{Context, Result};
use clap::Parser;
use compress_bench::{
    cli::{Args, HarnessConfig, OutputFormat},
    report::{JsonSink, ResultSink, TableSink},
    BenchmarkRunner, Suite,
};
use std::fs::File;
use tracing::{error, info};

fn main() -> Result<()> {
    // Log level is controlled via RUST_LOG, e.g.
    // RUST_LOG=debug compress-bench corpus.txt
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = HarnessConfig::from(&args);

    info!("starting compress-bench {}", compress_bench::VERSION);

    // Every input must be readable before any measurement begins, so a
    // typo never produces a partial report.
    for file in &config.files {
        File::open(file)
            .with_context(|| format!("input file not found or not readable: {}", file.display()))?;
    }

    let suite = match &args.suite {
        Some(path) => Suite::from_toml_file(path)
            .with_context(|| format!("failed to load suite '{}'", path.display()))?,
        None => Suite::default(),
    };

    let stdout = std::io::stdout();
    let mut sink: Box<dyn ResultSink> = match config.format {
        OutputFormat::Table => Box::new(TableSink::new(stdout, suite.name_column_width())),
        OutputFormat::Json => Box::new(JsonSink::new(stdout)),
    };

    match &args.suite {
        Some(path) => sink.message(&format!("Using suite '{}'", path.display()))?,
        None => sink.message("Using built-in default suite")?,
    }

    let mut runner = BenchmarkRunner::new(config, suite);
    let run_result = runner.run(sink.as_mut());

    if let Err(e) = &run_result {
        error!("benchmark run aborted: {e:#}");
        sink.message(&format!("ERROR: {e:#}"))?;
    }

    // Flush regardless of the outcome so partial results survive.
    sink.flush()?;
    run_result
}
