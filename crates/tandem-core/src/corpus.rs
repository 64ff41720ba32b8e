//! Corpus snapshot persistence.
//!
//! One serialized [`Chunk`] per line (JSONL). The snapshot is the
//! immutable input to index construction; a missing or unreadable file
//! maps to `Error::IndexUnavailable` and is fatal at load time. An empty
//! snapshot loads fine and only fails later as `EmptyCorpus` on the
//! first search.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Chunk;

pub fn load_corpus(path: &Path) -> Result<Vec<Chunk>> {
    let file = File::open(path).map_err(|e| unavailable(path, &e.to_string()))?;
    let reader = BufReader::new(file);

    let mut chunks = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| unavailable(path, &e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let chunk: Chunk = serde_json::from_str(&line).map_err(|e| {
            unavailable(path, &format!("bad chunk on line {}: {}", line_no + 1, e))
        })?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

pub fn save_corpus(path: &Path, chunks: &[Chunk]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| unavailable(path, &e.to_string()))?;
        }
    }
    let file = File::create(path).map_err(|e| unavailable(path, &e.to_string()))?;
    let mut writer = BufWriter::new(file);
    for chunk in chunks {
        let line =
            serde_json::to_string(chunk).map_err(|e| unavailable(path, &e.to_string()))?;
        writeln!(writer, "{}", line).map_err(|e| unavailable(path, &e.to_string()))?;
    }
    writer.flush().map_err(|e| unavailable(path, &e.to_string()))?;
    Ok(())
}

fn unavailable(path: &Path, reason: &str) -> Error {
    Error::IndexUnavailable { path: path.display().to_string(), reason: reason.to_string() }
}
