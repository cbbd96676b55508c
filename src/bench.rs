//! Benchmark orchestrator.
//!
//! Drives the whole run: for each input file, for each compressor pair
//! in suite order, the orchestrator samples compression time, peak
//! memory, and output size, then (unless disabled) decompression time
//! and memory plus round-trip verification, and emits one row to the
//! active result sink.
//!
//! ## Failure boundaries
//!
//! A missing executable for one pair marks the row with an error cell
//! and the run continues with the next pair. Any other failure
//! propagates and aborts the run; the binary still flushes whatever the
//! sink has accumulated, and scratch files are removed on every path.
//!
//! ## Resource model
//!
//! Deliberately single-threaded and sequential: one pair, one file, one
//! iteration at a time, so wall-clock and peak-memory numbers are not
//! polluted by concurrent load from other pairs under test.

use crate::cli::HarnessConfig;
use crate::exec::{ExecError, RowLog};
use crate::report::{Cell, ResultSink, COLUMNS};
use crate::sampler::{sample_time, MemoryProfiler};
use crate::suite::{CompressorPair, Suite};
use crate::utils::{remove_if_exists, temp_path};
use crate::verify::{verify, DigestCache, Verdict};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of one pair's measurement, at the per-pair recovery boundary.
enum PairOutcome {
    /// Row fully emitted.
    Measured,
    /// A tool was missing; the row was marked and padded.
    ToolMissing(String),
}

/// Top-level control loop for one benchmark run.
///
/// Owns the suite, the memory profiler (probed once at construction),
/// the digest cache, and the accumulated run log.
pub struct BenchmarkRunner {
    config: HarnessConfig,
    suite: Suite,
    profiler: MemoryProfiler,
    digests: DigestCache,
    run_log: String,
}

impl BenchmarkRunner {
    /// Build a runner. The memory profiler is probed here, exactly once;
    /// with `--no-memory` the probe is skipped entirely.
    pub fn new(config: HarnessConfig, suite: Suite) -> Self {
        let profiler = if config.measure_memory {
            MemoryProfiler::probe(&config.temp_dir)
        } else {
            MemoryProfiler::disabled(&config.temp_dir)
        };

        Self {
            config,
            suite,
            profiler,
            digests: DigestCache::new(),
            run_log: String::new(),
        }
    }

    /// Whether memory columns will carry real measurements this run.
    pub fn memory_available(&self) -> bool {
        self.profiler.is_available()
    }

    /// Execute the full run against the configured input files.
    ///
    /// The sink is not flushed here; the caller flushes it even when
    /// this returns an error, so partial results survive an abort.
    pub fn run(&mut self, sink: &mut dyn ResultSink) -> Result<()> {
        if self.config.measure_memory && !self.profiler.is_available() {
            sink.message("WARNING: valgrind not found - memory measurement unavailable.")?;
            sink.message("")?;
        }

        sink.message(&format!(
            "Number of iterations per file: {}",
            self.config.iterations
        ))?;

        let files = self.config.files.clone();
        let mut result = Ok(());
        for file in &files {
            if let Err(e) = self.run_file(file, sink) {
                result = Err(e);
                break;
            }
        }

        // The dump happens even when a pair aborted the run, so the
        // captured stderr of the failing tool still reaches the sink
        // alongside the partial results.
        if self.config.dump_log {
            sink.message("")?;
            sink.message("Log output (use --no-log to disable):")?;
            sink.message(&self.run_log)?;
        }

        result
    }

    /// Measure every suite pair against one input file.
    fn run_file(&mut self, file: &Path, sink: &mut dyn ResultSink) -> Result<()> {
        info!(file = %file.display(), "benchmarking input file");

        let size = fs::metadata(file)
            .with_context(|| format!("cannot stat input file '{}'", file.display()))?
            .len();

        // The original digest is only needed for round-trip checks, and
        // the cache guarantees one computation per file across all pairs.
        let digest = if self.config.decompress {
            self.digests.digest(file)?
        } else {
            "-".to_string()
        };

        sink.file_header(&file.display().to_string(), size, &digest)?;
        sink.columns(&COLUMNS)?;

        // Fresh scratch names per file; removed below on both paths.
        let compressed = temp_path(&self.config.temp_dir, "compressed");
        let decompressed = temp_path(&self.config.temp_dir, "decompressed");

        let mut result = Ok(());
        let pairs = self.suite.pairs.clone();
        for pair in &pairs {
            match self.run_pair(pair, file, size, &digest, &compressed, &decompressed, sink) {
                Ok(PairOutcome::Measured) => {}
                Ok(PairOutcome::ToolMissing(program)) => {
                    warn!(pair = %pair.name, program = %program, "tool not found, skipping pair");
                    let note = format!("ERROR: no executable '{}' for '{}'", program, pair.name);
                    sink.message(&note)?;
                    self.run_log.push_str(&note);
                    self.run_log.push('\n');
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        remove_if_exists(&compressed);
        remove_if_exists(&decompressed);
        result
    }

    /// Measure one pair and emit its row.
    ///
    /// A missing tool short-circuits the rest of the row (no memory
    /// sampling, no decompression against a missing compressed output)
    /// and pads it with placeholder cells so the report stays
    /// rectangular.
    #[allow(clippy::too_many_arguments)]
    fn run_pair(
        &mut self,
        pair: &CompressorPair,
        file: &Path,
        src_size: u64,
        src_digest: &str,
        compressed: &Path,
        decompressed: &Path,
        sink: &mut dyn ResultSink,
    ) -> Result<PairOutcome> {
        sink.cell(Cell::Name(pair.name.clone()))?;

        let mut log = RowLog::new();
        let iterations = self.config.iterations;

        // Compression timing.
        let comp_time = match sample_time(&pair.compress, file, compressed, iterations, Some(&mut log)) {
            Ok(t) => t,
            Err(ExecError::ToolNotFound { program }) => {
                self.mark_row_failed(sink, COLUMNS.len() - 1)?;
                self.absorb_row_log(&pair.name, &log);
                return Ok(PairOutcome::ToolMissing(program));
            }
            Err(e) => {
                self.absorb_row_log(&pair.name, &log);
                return Err(e).context(format!("compression failed for '{}'", pair.name));
            }
        };
        sink.cell(Cell::Time(comp_time))?;

        // Compression peak memory.
        if self.profiler.is_available() {
            let mem = self
                .profiler
                .measure(&pair.compress, file, compressed)
                .with_context(|| format!("memory measurement failed for '{}'", pair.name))?;
            sink.cell(Cell::Memory(mem))?;
        } else {
            sink.cell(Cell::Unavailable)?;
        }

        // Compression rate: output size over input size. An empty
        // input has no meaningful rate, and the division would poison
        // the structured output with a non-finite value.
        let out_size = fs::metadata(compressed)
            .with_context(|| format!("missing compressed output for '{}'", pair.name))?
            .len();
        if src_size == 0 {
            sink.cell(Cell::Skipped)?;
        } else {
            sink.cell(Cell::Ratio(out_size as f64 / src_size as f64))?;
        }

        if self.config.decompress {
            // Decompression timing; a missing decompressor is recovered
            // the same way as a missing compressor.
            let dec_time = match sample_time(
                &pair.decompress,
                compressed,
                decompressed,
                iterations,
                Some(&mut log),
            ) {
                Ok(t) => t,
                Err(ExecError::ToolNotFound { program }) => {
                    self.mark_row_failed(sink, 3)?;
                    self.absorb_row_log(&pair.name, &log);
                    return Ok(PairOutcome::ToolMissing(program));
                }
                Err(e) => {
                    self.absorb_row_log(&pair.name, &log);
                    return Err(e).context(format!("decompression failed for '{}'", pair.name));
                }
            };
            sink.cell(Cell::Time(dec_time))?;

            // Decompression peak memory.
            if self.profiler.is_available() {
                let mem = self
                    .profiler
                    .measure(&pair.decompress, compressed, decompressed)
                    .with_context(|| format!("memory measurement failed for '{}'", pair.name))?;
                sink.cell(Cell::Memory(mem))?;
            } else {
                sink.cell(Cell::Unavailable)?;
            }

            // Round-trip verdict; a mismatch is a row value, not an error.
            let verdict = verify(src_digest, decompressed)
                .with_context(|| format!("verification failed for '{}'", pair.name))?;
            sink.cell(Cell::Verdict(verdict))?;
        } else {
            sink.cell(Cell::Skipped)?;
            sink.cell(Cell::Skipped)?;
            sink.cell(Cell::Verdict(Verdict::Skipped))?;
        }

        sink.end_row()?;
        self.absorb_row_log(&pair.name, &log);
        Ok(PairOutcome::Measured)
    }

    /// Emit the error marker plus placeholders for the remaining
    /// columns, then close the row.
    fn mark_row_failed(&self, sink: &mut dyn ResultSink, remaining: usize) -> Result<()> {
        sink.cell(Cell::Error)?;
        for _ in 0..remaining.saturating_sub(1) {
            sink.cell(Cell::Skipped)?;
        }
        sink.end_row()?;
        Ok(())
    }

    /// Fold a row's captured child output into the run log.
    fn absorb_row_log(&mut self, pair_name: &str, log: &RowLog) {
        self.run_log
            .push_str(&format!("\n### output of {} ###\n", pair_name));
        self.run_log.push_str(log.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::report::JsonSink;
    use crate::suite::{CompressorPair, InvocationSpec};
    use tempfile::tempdir;

    fn identity_pair(name: &str) -> CompressorPair {
        CompressorPair {
            name: name.to_string(),
            compress: InvocationSpec::piped("cat", &[]),
            decompress: InvocationSpec::piped("cat", &[]),
        }
    }

    fn config(dir: &Path, files: Vec<std::path::PathBuf>) -> HarnessConfig {
        HarnessConfig {
            files,
            iterations: 1,
            format: OutputFormat::Json,
            measure_memory: false,
            decompress: true,
            dump_log: false,
            temp_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_one_row_per_file_and_pair() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, b"the quick brown fox").unwrap();

        let suite = Suite {
            pairs: vec![identity_pair("copy a"), identity_pair("copy b")],
        };
        let mut runner = BenchmarkRunner::new(config(dir.path(), vec![input]), suite);

        let mut buf = Vec::new();
        let mut sink = JsonSink::new(&mut buf);
        runner.run(&mut sink).unwrap();
        sink.flush().unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let files = doc["files"].as_object().unwrap();
        assert_eq!(files.len(), 1);

        let (_, entry) = files.iter().next().unwrap();
        let names = entry["cols"]["Compressor"].as_array().unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(entry["cols"]["Check"][0], "OK");
        assert_eq!(entry["cols"]["Check"][1], "OK");
    }

    #[test]
    fn test_identity_pipeline_ratio_is_one() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, b"identical in, identical out").unwrap();

        let suite = Suite {
            pairs: vec![identity_pair("copy")],
        };
        let mut runner = BenchmarkRunner::new(config(dir.path(), vec![input]), suite);

        let mut buf = Vec::new();
        let mut sink = JsonSink::new(&mut buf);
        runner.run(&mut sink).unwrap();
        sink.flush().unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let (_, entry) = doc["files"].as_object().unwrap().iter().next().unwrap();
        assert_eq!(entry["cols"]["C Rate"][0], 1.0);
    }

    #[test]
    fn test_memory_disabled_reads_unavailable() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, b"no profiler here").unwrap();

        let suite = Suite {
            pairs: vec![identity_pair("copy")],
        };
        let mut runner = BenchmarkRunner::new(config(dir.path(), vec![input]), suite);
        assert!(!runner.memory_available());

        let mut buf = Vec::new();
        let mut sink = JsonSink::new(&mut buf);
        runner.run(&mut sink).unwrap();
        sink.flush().unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let (_, entry) = doc["files"].as_object().unwrap().iter().next().unwrap();
        assert_eq!(entry["cols"]["C Memory"][0], "(N/A)");
        assert_eq!(entry["cols"]["D Memory"][0], "(N/A)");
    }

    #[test]
    fn test_missing_tool_marks_row_and_continues() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, b"partial failure").unwrap();

        let suite = Suite {
            pairs: vec![
                CompressorPair {
                    name: "ghost".to_string(),
                    compress: InvocationSpec::piped("no-such-compressor-binary", &[]),
                    decompress: InvocationSpec::piped("no-such-compressor-binary", &["-d"]),
                },
                identity_pair("copy"),
            ],
        };
        let mut runner = BenchmarkRunner::new(config(dir.path(), vec![input]), suite);

        let mut buf = Vec::new();
        let mut sink = JsonSink::new(&mut buf);
        runner.run(&mut sink).unwrap();
        sink.flush().unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let (_, entry) = doc["files"].as_object().unwrap().iter().next().unwrap();

        // Both rows present and rectangular.
        for heading in COLUMNS {
            assert_eq!(entry["cols"][heading].as_array().unwrap().len(), 2);
        }
        assert_eq!(entry["cols"]["C Time"][0], "(ERR)");
        assert_eq!(entry["cols"]["Check"][0], "-");
        assert_eq!(entry["cols"]["Check"][1], "OK");

        // The failure is also reported as a message.
        let messages = doc["messages"].as_array().unwrap();
        assert!(messages
            .iter()
            .any(|m| m.as_str().unwrap().contains("no-such-compressor-binary")));
    }

    #[test]
    fn test_no_decompress_emits_placeholders() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, b"compress only").unwrap();

        let suite = Suite {
            pairs: vec![identity_pair("copy")],
        };
        let mut cfg = config(dir.path(), vec![input]);
        cfg.decompress = false;
        let mut runner = BenchmarkRunner::new(cfg, suite);

        let mut buf = Vec::new();
        let mut sink = JsonSink::new(&mut buf);
        runner.run(&mut sink).unwrap();
        sink.flush().unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let (_, entry) = doc["files"].as_object().unwrap().iter().next().unwrap();
        assert_eq!(entry["cols"]["D Time"][0], "-");
        assert_eq!(entry["cols"]["D Memory"][0], "-");
        assert_eq!(entry["cols"]["Check"][0], "-");
        assert_eq!(entry["digest"], "-");
    }

    #[test]
    fn test_failing_tool_aborts_run() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, b"will not survive").unwrap();

        let suite = Suite {
            pairs: vec![CompressorPair {
                name: "broken".to_string(),
                compress: InvocationSpec::piped("false", &[]),
                decompress: InvocationSpec::piped("false", &[]),
            }],
        };
        let mut runner = BenchmarkRunner::new(config(dir.path(), vec![input]), suite);

        let mut buf = Vec::new();
        let mut sink = JsonSink::new(&mut buf);
        assert!(runner.run(&mut sink).is_err());
    }

    #[test]
    fn test_aborted_run_still_dumps_log() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, b"partial report").unwrap();

        let suite = Suite {
            pairs: vec![
                identity_pair("copy"),
                CompressorPair {
                    name: "broken".to_string(),
                    compress: InvocationSpec::piped("false", &[]),
                    decompress: InvocationSpec::piped("false", &[]),
                },
            ],
        };
        let mut cfg = config(dir.path(), vec![input]);
        cfg.dump_log = true;
        let mut runner = BenchmarkRunner::new(cfg, suite);

        let mut buf = Vec::new();
        let mut sink = JsonSink::new(&mut buf);
        assert!(runner.run(&mut sink).is_err());
        sink.flush().unwrap();

        // The flushed partial document still carries the log dump,
        // including the banner for the pair that aborted the run.
        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let messages = doc["messages"].as_array().unwrap();
        assert!(messages
            .iter()
            .any(|m| m.as_str().unwrap().contains("Log output")));
        assert!(messages
            .iter()
            .any(|m| m.as_str().unwrap().contains("### output of broken ###")));
    }

    #[test]
    fn test_empty_input_skips_rate() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("empty.txt");
        fs::write(&input, b"").unwrap();

        let suite = Suite {
            pairs: vec![identity_pair("copy")],
        };
        let mut runner = BenchmarkRunner::new(config(dir.path(), vec![input]), suite);

        let mut buf = Vec::new();
        let mut sink = JsonSink::new(&mut buf);
        runner.run(&mut sink).unwrap();
        sink.flush().unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let (_, entry) = doc["files"].as_object().unwrap().iter().next().unwrap();
        assert_eq!(entry["cols"]["C Rate"][0], "-");
        assert_eq!(entry["cols"]["Check"][0], "OK");
    }

    #[test]
    fn test_run_log_collects_pair_banners() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, b"logged").unwrap();

        let suite = Suite {
            pairs: vec![identity_pair("copy")],
        };
        let mut cfg = config(dir.path(), vec![input]);
        cfg.dump_log = true;
        let mut runner = BenchmarkRunner::new(cfg, suite);

        let mut buf = Vec::new();
        let mut sink = JsonSink::new(&mut buf);
        runner.run(&mut sink).unwrap();
        sink.flush().unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let messages = doc["messages"].as_array().unwrap();
        assert!(messages
            .iter()
            .any(|m| m.as_str().unwrap().contains("### output of copy ###")));
    }
}
