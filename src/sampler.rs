//! Timing and memory sampling around the process invocation adapter.
//!
//! The timing sampler repeats an invocation and reduces the per-run
//! wall-clock times to their median, which is far less sensitive to
//! scheduling outliers (disk cache warm-up, background load) than the
//! mean. The memory sampler wraps a single invocation in valgrind's
//! massif tool and extracts the peak heap size from the trace it writes.

use crate::exec::{run_invocation, ExecError, RowLog};
use crate::suite::InvocationSpec;
use crate::utils::temp_path;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

/// Trace marker emitted by massif for each heap snapshot.
const HEAP_MARKER: &str = "mem_heap_B=";

/// Run an invocation `iterations` times and return the median duration.
///
/// Each iteration is a fully independent invocation against the same
/// input/output pair; the adapter truncates the output file every time.
/// Only the first iteration's child output is captured into the row log,
/// since the repeats run the identical command. Any iteration failure
/// aborts the sampler with that error.
pub fn sample_time(
    spec: &InvocationSpec,
    input: &Path,
    output: &Path,
    iterations: usize,
    mut log: Option<&mut RowLog>,
) -> Result<Duration, ExecError> {
    let iterations = iterations.max(1);
    let mut samples = Vec::with_capacity(iterations);

    for _ in 0..iterations {
        samples.push(run_invocation(spec, input, output, log.take())?);
    }

    Ok(median(&mut samples))
}

/// The statistical median of a non-empty sample set.
///
/// For an even count, the two middle samples are averaged.
fn median(samples: &mut [Duration]) -> Duration {
    samples.sort_unstable();
    let mid = samples.len() / 2;
    if samples.len() % 2 == 1 {
        samples[mid]
    } else {
        (samples[mid - 1] + samples[mid]) / 2
    }
}

/// Peak-memory measurement via an external heap profiler.
///
/// Availability is probed exactly once at startup. When the profiler is
/// missing, the sampler stays disabled for the entire run and the
/// orchestrator substitutes an "unavailable" cell in every row instead
/// of retrying per pair.
#[derive(Debug)]
pub struct MemoryProfiler {
    available: bool,
    temp_dir: PathBuf,
}

impl MemoryProfiler {
    /// Probe for valgrind once and remember the outcome.
    pub fn probe(temp_dir: &Path) -> Self {
        let available = Command::new("valgrind")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);

        if !available {
            warn!("valgrind not found; memory measurement disabled for this run");
        }

        Self {
            available,
            temp_dir: temp_dir.to_path_buf(),
        }
    }

    /// A profiler that never measures, for runs with memory measurement
    /// switched off. The probe is skipped entirely.
    pub fn disabled(temp_dir: &Path) -> Self {
        Self {
            available: false,
            temp_dir: temp_dir.to_path_buf(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Measure the peak heap size of one invocation.
    ///
    /// The target command is wrapped as
    /// `valgrind -q --tool=massif --pages-as-heap=yes
    /// --massif-out-file=<trace> <program> <args...>`, preserving the
    /// spec's I/O wiring. The trace file is parsed for the maximum
    /// `mem_heap_B=` marker and removed on every path, success or
    /// failure.
    pub fn measure(
        &self,
        spec: &InvocationSpec,
        input: &Path,
        output: &Path,
    ) -> Result<u64, ExecError> {
        debug_assert!(self.available, "measure called on a disabled profiler");

        let trace = temp_path(&self.temp_dir, "massif");

        let mut args = vec![
            "-q".to_string(),
            "--tool=massif".to_string(),
            "--pages-as-heap=yes".to_string(),
            format!("--massif-out-file={}", trace.display()),
            spec.program.clone(),
        ];
        args.extend(spec.args.iter().cloned());

        let wrapped = InvocationSpec {
            program: "valgrind".to_string(),
            args,
            input: spec.input.clone(),
            output: spec.output.clone(),
        };

        let result = run_invocation(&wrapped, input, output, None).and_then(|_| {
            let file = File::open(&trace).map_err(|source| ExecError::Io {
                command: wrapped.command_line(),
                source,
            })?;
            parse_peak_heap(BufReader::new(file)).map_err(|source| ExecError::Io {
                command: wrapped.command_line(),
                source,
            })
        });

        // The trace must never leak across runs, even when the wrapped
        // command or the parse failed.
        let _ = fs::remove_file(&trace);

        if let Ok(peak) = &result {
            debug!(program = %spec.program, peak_bytes = peak, "massif peak parsed");
        }
        result
    }
}

/// Scan a massif trace for the maximum heap size across all snapshots.
fn parse_peak_heap<R: BufRead>(reader: R) -> std::io::Result<u64> {
    let mut peak = 0u64;
    for line in reader.lines() {
        let line = line?;
        if let Some(value) = line.strip_prefix(HEAP_MARKER) {
            if let Ok(bytes) = value.trim().parse::<u64>() {
                peak = peak.max(bytes);
            }
        }
    }
    Ok(peak)
}
