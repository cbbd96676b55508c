//! Suite definition: which compressor pairs to benchmark and how to
//! invoke them.
//!
//! A suite is an ordered, non-empty list of [`CompressorPair`] records.
//! Each pair names a compress command and a decompress command, both
//! described declaratively by an [`InvocationSpec`]: the program, its
//! fixed arguments, and how the input and output files are wired to the
//! process (standard I/O or path arguments).
//!
//! Suites are either the built-in default (standard system compressors)
//! or loaded from a TOML file and validated against the pair schema
//! before any measurement starts. Loading never executes suite contents.
//!
//! ## Suite file format
//!
//! ```toml
//! [[pair]]
//! name = "gzip -9"
//!
//! [pair.compress]
//! program = "gzip"
//! args = ["-9"]
//!
//! [pair.decompress]
//! program = "gzip"
//! args = ["-d"]
//! ```
//!
//! `input` and `output` default to `"piped"`. A tool that takes its
//! output path as a flagged argument declares it explicitly:
//!
//! ```toml
//! [pair.compress]
//! program = "mycomp"
//! args = ["-a", "lzw"]
//! output = { file_arg = { flag = "--output" } }
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How one end of an invocation is wired to a concrete file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoMode {
    /// The harness opens the file itself and connects it to the child's
    /// standard input or output.
    #[default]
    Piped,
    /// The resolved path is appended to the argument list, preceded by
    /// `flag` when present, and the child opens the file on its own.
    FileArg {
        #[serde(default)]
        flag: Option<String>,
    },
}

/// Declarative description of how to run one external command.
///
/// Exactly one input mode and one output mode are active per invocation.
/// When both ends are path arguments, the input argument is appended
/// before the output argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvocationSpec {
    /// Executable name or path.
    pub program: String,
    /// Fixed arguments, before any appended input/output paths.
    #[serde(default)]
    pub args: Vec<String>,
    /// Input wiring mode.
    #[serde(default)]
    pub input: IoMode,
    /// Output wiring mode.
    #[serde(default)]
    pub output: IoMode,
}

impl InvocationSpec {
    /// A spec reading from stdin and writing to stdout, the common case
    /// for standard stream compressors.
    pub fn piped(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            input: IoMode::Piped,
            output: IoMode::Piped,
        }
    }

    /// The command line as a display string, for logs and error reports.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// A named (compress, decompress) command pair under test.
///
/// Constructed once per suite load and read-only afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompressorPair {
    /// Display name used in report rows.
    pub name: String,
    /// How to compress an input file.
    pub compress: InvocationSpec,
    /// How to decompress a compressed file.
    pub decompress: InvocationSpec,
}

impl CompressorPair {
    /// A pair whose binary compresses and decompresses via stdin/stdout,
    /// selected by flags. Covers gzip-style tools.
    pub fn stream_compressor(name: &str, binary: &str, cflags: &[&str], dflags: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            compress: InvocationSpec::piped(binary, cflags),
            decompress: InvocationSpec::piped(binary, dflags),
        }
    }
}

/// The full, ordered set of compressor pairs evaluated in one run.
///
/// Suite order is significant for reproducible report layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suite {
    #[serde(rename = "pair")]
    pub pairs: Vec<CompressorPair>,
}

impl Default for Suite {
    /// The built-in suite: standard system compressors at a fast and a
    /// thorough level each.
    fn default() -> Self {
        Self {
            pairs: vec![
                CompressorPair::stream_compressor("gzip -1", "gzip", &["-1"], &["-d"]),
                CompressorPair::stream_compressor("gzip -9", "gzip", &["-9"], &["-d"]),
                CompressorPair::stream_compressor("bzip2 -1", "bzip2", &["-1"], &["-d"]),
                CompressorPair::stream_compressor("bzip2 -9", "bzip2", &["-9"], &["-d"]),
                CompressorPair::stream_compressor("xz -1", "xz", &["-1"], &["-d"]),
                CompressorPair::stream_compressor("xz -9", "xz", &["-9"], &["-d"]),
            ],
        }
    }
}

impl Suite {
    /// Load and validate a suite from a TOML description.
    ///
    /// Fails fast, before any measurement, when the file is unreadable,
    /// not valid TOML, or does not satisfy the pair schema.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read suite file '{}'", path.display()))?;
        let suite: Suite = toml::from_str(&text)
            .with_context(|| format!("suite file '{}' is not a valid suite", path.display()))?;
        suite.validate()?;
        Ok(suite)
    }

    /// Check the suite contract: non-empty, with well-formed pairs.
    pub fn validate(&self) -> Result<()> {
        if self.pairs.is_empty() {
            bail!("suite is empty; at least one compressor pair is required");
        }
        for pair in &self.pairs {
            if pair.name.trim().is_empty() {
                bail!("suite contains a compressor pair with an empty name");
            }
            for (role, spec) in [("compress", &pair.compress), ("decompress", &pair.decompress)] {
                if spec.program.trim().is_empty() {
                    bail!("pair '{}' has an empty {} program", pair.name, role);
                }
            }
        }
        Ok(())
    }

    /// Width of the report's name column: the longest pair name plus
    /// padding, with a sane floor.
    pub fn name_column_width(&self) -> usize {
        self.pairs
            .iter()
            .map(|p| p.name.len())
            .max()
            .unwrap_or(0)
            .max(10)
            + 3
    }
}
