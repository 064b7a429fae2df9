// Public API exports
pub mod chunker;
pub mod dataset;
pub mod retriever;
pub mod retry;
pub mod store;
pub mod summarizer;

// Re-export main types for convenience
pub use chunker::{
    BoundedSplitter, Chunk, ChunkEngine, ChunkEvent, CollectSink, Document, EngineConfig,
    EngineError, EventSink, Metadata, TracingSink, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
    DEFAULT_SEPARATORS, SUMMARY_KEY,
};

pub use summarizer::{
    ChatMessage, FailureMode, RemoteSummarizer, ResplitDecision, Summarizer, SummarizerError,
};

pub use retry::{parse_retry_after, with_retry, Backoff, CallError, RetryPolicy};

pub use store::{load_collections, write_collection, CHUNK_IDX_KEY, FILENAME_KEY};

pub use dataset::{load_qa_suite, QaRecord};

pub use retriever::{cosine_similarity, EmbedError, EmbeddingClient, VectorIndex};
