use serde::{Deserialize, Serialize};
use serde_json::Value;

/// String-keyed metadata carried by documents and chunks.
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key under which a chunk's summary is stored.
pub const SUMMARY_KEY: &str = "summary";

/// An input document: a text body plus caller-supplied metadata
/// (filename, source path, ...). Never mutated by the engine.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A finalized chunk: a contiguous slice of the source document plus a
/// per-chunk copy of the document metadata with the summary injected.
///
/// This is also the persisted record shape (see `store`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: Metadata,
}

impl Chunk {
    /// Build a chunk from finalized content, its summary, and the source
    /// document's metadata. The metadata is copied, not shared.
    pub fn new(content: impl Into<String>, summary: impl Into<String>, base: &Metadata) -> Self {
        let mut metadata = base.clone();
        metadata.insert(SUMMARY_KEY.to_string(), Value::String(summary.into()));
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// The running-context summary attached at emission time.
    pub fn summary(&self) -> Option<&str> {
        self.metadata.get(SUMMARY_KEY).and_then(Value::as_str)
    }
}
