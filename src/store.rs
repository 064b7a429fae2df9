// store.rs - persisted chunk collections, one JSON file per source document
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::chunker::Chunk;

/// Metadata key for the corpus-wide sequential index, assigned at load time.
pub const CHUNK_IDX_KEY: &str = "chunk_idx";

/// Metadata key for the originating collection file, assigned at load time.
pub const FILENAME_KEY: &str = "filename";

/// Write one document's finished chunk collection to `<dir>/<stem>.json`.
/// Collections are written once, after the engine run completes, and are
/// read-only afterward.
pub fn write_collection(dir: &Path, stem: &str, chunks: &[Chunk]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .context(format!("Failed to create chunk directory {}", dir.display()))?;

    let path = dir.join(format!("{stem}.json"));
    let file = File::create(&path)
        .context(format!("Failed to create collection file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), chunks)
        .context(format!("Failed to write collection {}", path.display()))?;

    Ok(path)
}

/// Load every collection under `dir` (recursively, in file-name order),
/// annotating each chunk with its originating `filename` and a corpus-wide
/// sequential `chunk_idx`. Undecodable collection files are skipped with a
/// warning; the surrounding load continues.
pub fn load_collections(dir: &Path) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    let mut chunk_idx: u64 = 0;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.context("Failed to walk chunk directory")?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let file = File::open(entry.path())
            .context(format!("Failed to open collection {}", entry.path().display()))?;
        let in_file: Vec<Chunk> = match serde_json::from_reader(BufReader::new(file)) {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(
                    "skipping undecodable collection {}: {e}",
                    entry.path().display()
                );
                continue;
            }
        };

        let filename = entry.file_name().to_string_lossy().to_string();
        for mut chunk in in_file {
            chunk
                .metadata
                .insert(FILENAME_KEY.to_string(), filename.clone().into());
            chunk
                .metadata
                .insert(CHUNK_IDX_KEY.to_string(), chunk_idx.into());
            chunk_idx += 1;
            chunks.push(chunk);
        }
    }

    Ok(chunks)
}
