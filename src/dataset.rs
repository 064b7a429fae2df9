// dataset.rs - open QA test-suite ingestion (one JSON object per line)
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

use crate::chunker::Metadata;

/// One open-ended QA record from a newline-delimited test suite.
#[derive(Debug, Clone, Serialize)]
pub struct QaRecord {
    pub question: String,
    pub answer_labels: Vec<String>,
    pub metadata: Metadata,
}

#[derive(Deserialize)]
struct RawRecord {
    question: String,
    #[serde(default)]
    answer_labels: Vec<Value>,
    #[serde(default)]
    metadata: Metadata,
}

/// Load a QA suite. Malformed or empty lines are skipped with a warning
/// rather than aborting the load.
pub fn load_qa_suite(path: &Path) -> Result<Vec<QaRecord>> {
    let file = File::open(path)
        .context(format!("Failed to open QA suite {}", path.display()))?;

    let mut suite = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.context("Failed to read QA suite line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<RawRecord>(trimmed) {
            Ok(raw) => suite.push(QaRecord {
                question: raw.question,
                answer_labels: raw.answer_labels.iter().map(label_text).collect(),
                metadata: raw.metadata,
            }),
            Err(e) => {
                warn!("skipping malformed QA record at line {}: {e}", line_no + 1);
            }
        }
    }

    Ok(suite)
}

/// Labels may arrive as strings or bare scalars; either way they are
/// compared as text downstream.
fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
