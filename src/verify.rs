//! Round-trip verification via content digests.
//!
//! After a compress/decompress round trip, the decompressed output must
//! be byte-identical to the original input. Both sides are reduced to a
//! blake3 digest; the original file's digest is cached so it is computed
//! at most once per input file regardless of suite size.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Round-trip correctness outcome for one benchmark row.
///
/// A digest mismatch is a reportable verdict, never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// Decompressed content matches the original.
    Ok,
    /// Decompressed content differs from the original.
    Fail,
    /// Decompression was disabled; neither pass nor fail.
    Skipped,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Ok => write!(f, "OK"),
            Verdict::Fail => write!(f, "FAIL"),
            Verdict::Skipped => write!(f, "-"),
        }
    }
}

/// Hex-encoded blake3 digest of a file's contents, streamed so large
/// inputs never have to fit in memory.
pub fn file_digest(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("cannot open '{}'", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("cannot digest '{}'", path.display()))?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compare a decompressed file against the original's digest.
pub fn verify(original_digest: &str, decompressed: &Path) -> Result<Verdict> {
    let actual = file_digest(decompressed)?;
    Ok(if actual == original_digest {
        Verdict::Ok
    } else {
        Verdict::Fail
    })
}

/// Per-run cache of original-file digests, keyed by path.
#[derive(Debug, Default)]
pub struct DigestCache {
    digests: HashMap<PathBuf, String>,
}

impl DigestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The digest of `path`, computed on first request and served from
    /// the cache afterwards.
    pub fn digest(&mut self, path: &Path) -> Result<String> {
        if let Some(cached) = self.digests.get(path) {
            return Ok(cached.clone());
        }
        let digest = file_digest(path)?;
        self.digests.insert(path.to_path_buf(), digest.clone());
        Ok(digest)
    }
}
