mod engine;
mod events;
mod splitter;
mod types;

#[cfg(test)]
mod tests;

pub use engine::{ChunkEngine, EngineConfig, EngineError, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use events::{ChunkEvent, CollectSink, EventSink, TracingSink};
pub use splitter::{BoundedSplitter, DEFAULT_SEPARATORS};
pub use types::{Chunk, Document, Metadata, SUMMARY_KEY};
