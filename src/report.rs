//! Result sinks: where benchmark rows go.
//!
//! The orchestrator emits rows cell by cell through the [`ResultSink`]
//! trait and never knows which implementation is active. Two sinks
//! conform to the same call sequence:
//!
//! - [`TableSink`] streams a fixed-width, pipe-delimited table to its
//!   writer as values arrive and retains nothing.
//! - [`JsonSink`] buffers everything into a nested mapping keyed by
//!   input-file name and column name, and serializes one self-describing
//!   JSON document on flush, for downstream plotting and analysis tools.
//!
//! Cells carry semantic values (durations, byte counts, fractions), so
//! each sink owns its own rendering: human-readable strings for the
//! table, raw machine-oriented values for the document.

use crate::utils::{format_bytes, format_duration};
use crate::verify::Verdict;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

/// Column headings, emitted once per input file.
pub const COLUMNS: [&str; 7] = [
    "Compressor",
    "C Time",
    "C Memory",
    "C Rate",
    "D Time",
    "D Memory",
    "Check",
];

/// One value of a benchmark row.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    /// Compressor pair display name.
    Name(String),
    /// A sampled wall-clock duration.
    Time(Duration),
    /// A peak memory size in bytes.
    Memory(u64),
    /// Output-size over input-size fraction.
    Ratio(f64),
    /// Round-trip verdict.
    Verdict(Verdict),
    /// Memory measurement unavailable for this run.
    Unavailable,
    /// Column skipped by configuration.
    Skipped,
    /// The measurement failed for this pair.
    Error,
}

impl Cell {
    /// Human-readable text for the table sink.
    fn render(&self) -> String {
        match self {
            Cell::Name(name) => name.clone(),
            Cell::Time(t) => format_duration(*t),
            Cell::Memory(bytes) => format_bytes(*bytes),
            Cell::Ratio(fraction) => format!("{:.4}%", fraction * 100.0),
            Cell::Verdict(v) => v.to_string(),
            Cell::Unavailable => "(N/A)".to_string(),
            Cell::Skipped => "-".to_string(),
            Cell::Error => "(ERR)".to_string(),
        }
    }

    /// Raw value for the structured document: times in milliseconds,
    /// memory in bytes, the ratio as a fraction.
    fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Name(name) => serde_json::Value::from(name.as_str()),
            Cell::Time(t) => serde_json::Value::from(t.as_secs_f64() * 1000.0),
            Cell::Memory(bytes) => serde_json::Value::from(*bytes),
            Cell::Ratio(fraction) => serde_json::Value::from(*fraction),
            Cell::Verdict(v) => serde_json::Value::from(v.to_string()),
            Cell::Unavailable => serde_json::Value::from("(N/A)"),
            Cell::Skipped => serde_json::Value::from("-"),
            Cell::Error => serde_json::Value::from("(ERR)"),
        }
    }
}

/// Polymorphic accumulator/printer of benchmark rows.
///
/// The call sequence per input file is: `file_header`, `columns`, then
/// for each pair a run of `cell` calls closed by `end_row`. `message`
/// may be called at any time; `flush` exactly once at the end of the
/// run (also after an aborted run, to preserve partial results).
pub trait ResultSink {
    /// Record a free-form report message.
    fn message(&mut self, text: &str) -> Result<()>;
    /// Start a new input-file section.
    fn file_header(&mut self, name: &str, size: u64, digest: &str) -> Result<()>;
    /// Declare the column headings for the following rows.
    fn columns(&mut self, headings: &[&str]) -> Result<()>;
    /// Append one value to the current row.
    fn cell(&mut self, cell: Cell) -> Result<()>;
    /// Close the current row.
    fn end_row(&mut self) -> Result<()>;
    /// Finalize the report.
    fn flush(&mut self) -> Result<()>;
}

/// Streaming fixed-width table formatter.
///
/// Writes each cell as it arrives and keeps no state beyond the current
/// column position, so partial rows remain visible even when a run
/// aborts mid-measurement.
pub struct TableSink<W: Write> {
    out: W,
    name_width: usize,
    col: usize,
}

/// Width of the non-name value columns.
const VALUE_WIDTH: usize = 11;
/// Width of the verdict column.
const CHECK_WIDTH: usize = 5;

impl<W: Write> TableSink<W> {
    /// `name_width` should come from
    /// [`Suite::name_column_width`](crate::suite::Suite::name_column_width)
    /// so the name column fits the longest pair name.
    pub fn new(out: W, name_width: usize) -> Self {
        Self {
            out,
            name_width,
            col: 0,
        }
    }

    fn width_for(&self, col: usize) -> usize {
        match col {
            0 => self.name_width,
            c if c == COLUMNS.len() - 1 => CHECK_WIDTH,
            _ => VALUE_WIDTH,
        }
    }
}

impl<W: Write> ResultSink for TableSink<W> {
    fn message(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text)?;
        Ok(())
    }

    fn file_header(&mut self, name: &str, size: u64, digest: &str) -> Result<()> {
        writeln!(self.out)?;
        writeln!(
            self.out,
            "File: {} ({}, blake3={})",
            name,
            format_bytes(size),
            digest
        )?;
        Ok(())
    }

    fn columns(&mut self, headings: &[&str]) -> Result<()> {
        writeln!(self.out)?;
        for (col, heading) in headings.iter().enumerate() {
            let w = self.width_for(col);
            write!(self.out, "{:>w$} | ", heading, w = w)?;
        }
        writeln!(self.out)?;

        let total: usize = (0..headings.len()).map(|c| self.width_for(c) + 3).sum();
        writeln!(self.out, "{}", "-".repeat(total))?;

        self.col = 0;
        Ok(())
    }

    fn cell(&mut self, cell: Cell) -> Result<()> {
        // Pad before colorizing so ANSI escapes do not skew the layout.
        let padded = format!("{:>w$}", cell.render(), w = self.width_for(self.col));
        let text = match &cell {
            Cell::Verdict(Verdict::Ok) => padded.green().to_string(),
            Cell::Verdict(Verdict::Fail) | Cell::Error => padded.red().to_string(),
            _ => padded,
        };
        // An error cell ends the row early; mark it with a distinct
        // separator, as readers scan for it in long tables.
        let sep = if cell == Cell::Error { ">" } else { "|" };
        write!(self.out, "{} {} ", text, sep)?;
        self.out.flush()?;

        self.col += 1;
        Ok(())
    }

    fn end_row(&mut self) -> Result<()> {
        writeln!(self.out)?;
        self.col = 0;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Buffered structured sink.
///
/// Accumulates messages, file headers, and cell values into a nested
/// mapping and serializes the whole run as one pretty-printed JSON
/// document on flush.
pub struct JsonSink<W: Write> {
    out: W,
    messages: Vec<String>,
    files: BTreeMap<String, FileEntry>,
    current_file: Option<String>,
    headings: Vec<String>,
    current_heading: usize,
}

#[derive(Debug, Serialize)]
struct FileEntry {
    size: u64,
    digest: String,
    cols: BTreeMap<String, Vec<serde_json::Value>>,
}

#[derive(Serialize)]
struct Document<'a> {
    metadata: Metadata,
    messages: &'a [String],
    files: &'a BTreeMap<String, FileEntry>,
}

#[derive(Serialize)]
struct Metadata {
    version: &'static str,
    generated_at: chrono::DateTime<chrono::Utc>,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            messages: Vec::new(),
            files: BTreeMap::new(),
            current_file: None,
            headings: Vec::new(),
            current_heading: 0,
        }
    }
}

impl<W: Write> ResultSink for JsonSink<W> {
    fn message(&mut self, text: &str) -> Result<()> {
        self.messages.push(text.to_string());
        Ok(())
    }

    fn file_header(&mut self, name: &str, size: u64, digest: &str) -> Result<()> {
        self.files.insert(
            name.to_string(),
            FileEntry {
                size,
                digest: digest.to_string(),
                cols: BTreeMap::new(),
            },
        );
        self.current_file = Some(name.to_string());
        Ok(())
    }

    fn columns(&mut self, headings: &[&str]) -> Result<()> {
        self.headings = headings.iter().map(|h| h.to_string()).collect();
        self.current_heading = 0;
        if let Some(entry) = self
            .current_file
            .as_ref()
            .and_then(|f| self.files.get_mut(f))
        {
            for heading in &self.headings {
                entry.cols.insert(heading.clone(), Vec::new());
            }
        }
        Ok(())
    }

    fn cell(&mut self, cell: Cell) -> Result<()> {
        let heading = self.headings.get(self.current_heading).cloned();
        if let (Some(heading), Some(entry)) = (
            heading,
            self.current_file
                .as_ref()
                .and_then(|f| self.files.get_mut(f)),
        ) {
            if let Some(values) = entry.cols.get_mut(&heading) {
                values.push(cell.to_json());
            }
        }
        self.current_heading += 1;
        Ok(())
    }

    fn end_row(&mut self) -> Result<()> {
        self.current_heading = 0;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let document = Document {
            metadata: Metadata {
                version: crate::VERSION,
                generated_at: chrono::Utc::now(),
            },
            messages: &self.messages,
            files: &self.files,
        };
        serde_json::to_writer_pretty(&mut self.out, &document)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}
