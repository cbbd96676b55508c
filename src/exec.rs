//! Process invocation adapter.
//!
//! Runs a single external command described by an [`InvocationSpec`]
//! against concrete input and output paths, wiring standard I/O or
//! appending path arguments according to the spec's modes, and measures
//! the wall-clock time from just before spawn until the process has
//! exited.
//!
//! Child diagnostics (standard error, and standard output when it is not
//! the data channel) are captured into a caller-supplied [`RowLog`] so
//! the orchestrator can fold them into the end-of-run log dump.

use crate::suite::{InvocationSpec, IoMode};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Failure modes of one external command invocation.
///
/// The orchestrator discriminates on these: a missing executable marks
/// the row and the run continues, while a failing tool aborts the run
/// because it leaves the output state ambiguous.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The executable could not be located.
    #[error("executable '{program}' not found")]
    ToolNotFound { program: String },

    /// The tool ran but exited with a non-zero status.
    #[error("command '{command}' failed with {status}")]
    NonZeroExit { command: String, status: ExitStatus },

    /// File or pipe handling around the invocation failed.
    #[error("i/o error while running '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Captured child output for one benchmark row.
///
/// The adapter and samplers receive an explicit handle scoped to the
/// current row; the orchestrator owns it and releases it on every exit
/// path, including early failure.
#[derive(Debug, Default)]
pub struct RowLog {
    buf: String,
}

impl RowLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Execute one invocation to completion and return its wall-clock time.
///
/// - Any stale file at `output_path` is removed first, so file-argument
///   outputs can never silently append to leftovers.
/// - Piped ends are opened by the harness; file-argument ends are
///   appended to the argument list (input before output) and opened by
///   the child.
/// - With `log` present, standard error is captured into it, and so is
///   standard output unless the output mode is piped (then it carries
///   the data). With `log` absent, diagnostics are discarded.
pub fn run_invocation(
    spec: &InvocationSpec,
    input_path: &Path,
    output_path: &Path,
    log: Option<&mut RowLog>,
) -> Result<Duration, ExecError> {
    let command_line = spec.command_line();
    let io_err = |source| ExecError::Io {
        command: command_line.clone(),
        source,
    };

    if output_path.exists() {
        fs::remove_file(output_path).map_err(io_err)?;
    }

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);

    match &spec.input {
        IoMode::Piped => {
            let infile = File::open(input_path).map_err(io_err)?;
            cmd.stdin(Stdio::from(infile));
        }
        IoMode::FileArg { flag } => {
            if let Some(flag) = flag {
                cmd.arg(flag);
            }
            cmd.arg(input_path);
            cmd.stdin(Stdio::null());
        }
    }

    let capture = log.is_some();
    let stdout_is_data = match &spec.output {
        IoMode::Piped => {
            let outfile = File::create(output_path).map_err(io_err)?;
            cmd.stdout(Stdio::from(outfile));
            true
        }
        IoMode::FileArg { flag } => {
            if let Some(flag) = flag {
                cmd.arg(flag);
            }
            cmd.arg(output_path);
            cmd.stdout(if capture { Stdio::piped() } else { Stdio::null() });
            false
        }
    };
    cmd.stderr(if capture { Stdio::piped() } else { Stdio::null() });

    debug!(command = %command_line, input = %input_path.display(), output = %output_path.display(), "invoking");

    let started = Instant::now();
    let child = cmd.spawn().map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ExecError::ToolNotFound {
                program: spec.program.clone(),
            }
        } else {
            ExecError::Io {
                command: command_line.clone(),
                source: e,
            }
        }
    })?;

    // wait_with_output drains the piped handles while waiting, so a
    // chatty child cannot deadlock on a full pipe.
    let output = child.wait_with_output().map_err(io_err)?;
    let elapsed = started.elapsed();

    if let Some(log) = log {
        if !output.stderr.is_empty() {
            log.append(&String::from_utf8_lossy(&output.stderr));
        }
        if !stdout_is_data && !output.stdout.is_empty() {
            log.append(&String::from_utf8_lossy(&output.stdout));
        }
    }

    if !output.status.success() {
        return Err(ExecError::NonZeroExit {
            command: command_line,
            status: output.status,
        });
    }

    Ok(elapsed)
}
