//! # compress-bench
//!
//! A benchmark harness for comparing data-compression tools. The harness
//! drives a configurable suite of compressor/decompressor pairs against a
//! set of input files and reports, per (file, pair): compression time,
//! compression peak memory, compression rate, decompression time and
//! memory, and a round-trip correctness verdict.
//!
//! ## Architecture Overview
//!
//! The crate is organized around a small set of components, leaves first:
//!
//! - `suite`: declarative description of the compressor pairs under test
//! - `exec`: invocation of one external command with flexible I/O wiring
//! - `sampler`: repeated-trial timing (median) and massif-based peak
//!   memory extraction
//! - `verify`: round-trip digest verification with per-file caching
//! - `report`: the pluggable result sink (table or JSON document)
//! - `bench`: the orchestrator driving files, pairs, and samplers
//!
//! ## Measurement Model
//!
//! Everything runs single-threaded and sequential on purpose: wall-clock
//! timing and peak-memory measurement are only meaningful without
//! interference from concurrent load generated by other pairs under
//! test. The only blocking operations are subprocess execution and file
//! I/O.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use compress_bench::{BenchmarkRunner, HarnessConfig, JsonSink, ResultSink, Suite};
//! use compress_bench::cli::OutputFormat;
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = HarnessConfig {
//!         files: vec![PathBuf::from("corpus.txt")],
//!         iterations: 3,
//!         format: OutputFormat::Json,
//!         measure_memory: true,
//!         decompress: true,
//!         dump_log: false,
//!         temp_dir: std::env::temp_dir(),
//!     };
//!
//!     let mut runner = BenchmarkRunner::new(config, Suite::default());
//!     let mut sink = JsonSink::new(std::io::stdout());
//!     let result = runner.run(&mut sink);
//!     sink.flush()?;
//!     result
//! }
//! ```

/// Benchmark orchestration: the per-file, per-pair control loop.
pub mod bench;

/// Command-line interface and run configuration.
pub mod cli;

/// Process invocation adapter and its error taxonomy.
pub mod exec;

/// Result sinks: streaming table and buffered JSON document.
pub mod report;

/// Timing and memory samplers.
pub mod sampler;

/// Suite definition and loading.
pub mod suite;

/// Formatting helpers and scratch-file naming.
pub mod utils;

/// Round-trip verification.
pub mod verify;

pub use bench::BenchmarkRunner;
pub use cli::{Args, HarnessConfig, OutputFormat};
pub use exec::{ExecError, RowLog};
pub use report::{Cell, JsonSink, ResultSink, TableSink, COLUMNS};
pub use sampler::MemoryProfiler;
pub use suite::{CompressorPair, InvocationSpec, IoMode, Suite};
pub use verify::Verdict;

/// The current version of the harness, stamped into structured output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values.
pub mod defaults {
    /// Default timing iterations per measurement.
    ///
    /// A single iteration keeps runs fast; bump it with `-n` when
    /// scheduling noise matters, and the sampler reports the median.
    pub const ITERATIONS: usize = 1;
}
