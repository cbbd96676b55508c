use anyhow::Result;
use compress_bench::{
    cli::OutputFormat, BenchmarkRunner, CompressorPair, HarnessConfig, InvocationSpec, IoMode,
    JsonSink, ResultSink, Suite, TableSink, COLUMNS,
};
use std::fs;
use tempfile::tempdir;

/// An identity-preserving pipeline via standard I/O: compress and
/// decompress are both a plain copy, so the round trip must verify.
fn cat_pair(name: &str) -> CompressorPair {
    CompressorPair {
        name: name.to_string(),
        compress: InvocationSpec::piped("cat", &[]),
        decompress: InvocationSpec::piped("cat", &[]),
    }
}

/// The same identity pipeline via path arguments, exercising the
/// file-argument wiring mode end to end.
fn cp_pair(name: &str) -> CompressorPair {
    let spec = InvocationSpec {
        program: "cp".to_string(),
        args: vec![],
        input: IoMode::FileArg { flag: None },
        output: IoMode::FileArg { flag: None },
    };
    CompressorPair {
        name: name.to_string(),
        compress: spec.clone(),
        decompress: spec,
    }
}

fn config(temp_dir: &std::path::Path, files: Vec<std::path::PathBuf>) -> HarnessConfig {
    HarnessConfig {
        files,
        iterations: 3,
        format: OutputFormat::Json,
        measure_memory: false,
        decompress: true,
        dump_log: false,
        temp_dir: temp_dir.to_path_buf(),
    }
}

/// Two input files, two identity pairs: the structured document must
/// contain exactly two file entries with the same column set and two
/// values per column, and every verdict must be OK.
#[test]
fn structured_document_shape_and_verdicts() -> Result<()> {
    let dir = tempdir()?;
    let file_a = dir.path().join("a.txt");
    let file_b = dir.path().join("b.txt");
    fs::write(&file_a, b"first corpus, small but real")?;
    fs::write(&file_b, vec![0u8; 4096])?;

    let suite = Suite {
        pairs: vec![cat_pair("cat copy"), cp_pair("cp copy")],
    };
    let mut runner = BenchmarkRunner::new(
        config(dir.path(), vec![file_a.clone(), file_b.clone()]),
        suite,
    );

    let mut buf = Vec::new();
    let mut sink = JsonSink::new(&mut buf);
    runner.run(&mut sink)?;
    sink.flush()?;

    let doc: serde_json::Value = serde_json::from_slice(&buf)?;
    let files = doc["files"].as_object().unwrap();
    assert_eq!(files.len(), 2);

    for path in [&file_a, &file_b] {
        let entry = &files[&path.display().to_string()];
        let cols = entry["cols"].as_object().unwrap();
        assert_eq!(cols.len(), COLUMNS.len());
        for heading in COLUMNS {
            assert_eq!(
                cols[heading].as_array().unwrap().len(),
                2,
                "column '{heading}' must hold one value per pair"
            );
        }
        assert_eq!(cols["Check"][0], "OK");
        assert_eq!(cols["Check"][1], "OK");
        // Identity copy: compressed output is exactly the input size.
        assert_eq!(cols["C Rate"][0], 1.0);
    }

    assert_eq!(
        files[&file_a.display().to_string()]["size"],
        fs::metadata(&file_a)?.len()
    );

    // The document is self-describing.
    assert!(doc["metadata"]["version"].is_string());
    Ok(())
}

/// The table sink must render the same run as readable text with one
/// line per pair and an OK verdict.
#[test]
fn table_output_renders_rows() -> Result<()> {
    colored::control::set_override(false);

    let dir = tempdir()?;
    let input = dir.path().join("input.txt");
    fs::write(&input, b"tabular output")?;

    let suite = Suite {
        pairs: vec![cat_pair("cat copy")],
    };
    let width = suite.name_column_width();
    let mut runner = BenchmarkRunner::new(config(dir.path(), vec![input.clone()]), suite);

    let mut buf = Vec::new();
    let mut sink = TableSink::new(&mut buf, width);
    runner.run(&mut sink)?;
    sink.flush()?;

    let text = String::from_utf8(buf)?;
    assert!(text.contains(&format!("File: {}", input.display())));
    assert!(text.contains("Compressor"));
    assert!(text.contains("cat copy"));
    assert!(text.contains("OK"));
    Ok(())
}

/// With decompression disabled, the harness must never touch the
/// decompress command and the trailing columns read as placeholders.
#[test]
fn compress_only_run_skips_verification() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("input.txt");
    fs::write(&input, b"one way only")?;

    // A decompressor that would fail the run if it were ever invoked.
    let suite = Suite {
        pairs: vec![CompressorPair {
            name: "one-way".to_string(),
            compress: InvocationSpec::piped("cat", &[]),
            decompress: InvocationSpec::piped("false", &[]),
        }],
    };
    let mut cfg = config(dir.path(), vec![input]);
    cfg.decompress = false;
    let mut runner = BenchmarkRunner::new(cfg, suite);

    let mut buf = Vec::new();
    let mut sink = JsonSink::new(&mut buf);
    runner.run(&mut sink)?;
    sink.flush()?;

    let doc: serde_json::Value = serde_json::from_slice(&buf)?;
    let (_, entry) = doc["files"].as_object().unwrap().iter().next().unwrap();
    assert_eq!(entry["cols"]["D Time"][0], "-");
    assert_eq!(entry["cols"]["Check"][0], "-");
    Ok(())
}
