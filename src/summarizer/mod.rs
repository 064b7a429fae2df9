mod client;
mod protocol;


pub use client::RemoteSummarizer;
pub use protocol::{ChatMessage, FailureMode};

use thiserror::Error;

use crate::chunker::Metadata;
use crate::retry::CallError;

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error(transparent)]
    Call(#[from] CallError),

    #[error("malformed response for {operation}: {detail}")]
    MalformedResponse { operation: String, detail: String },
}

/// The capability's answer to a resplit request: a (possibly different)
/// boundary inside the two-candidate window.
#[derive(Debug, Clone, PartialEq)]
pub struct ResplitDecision {
    /// Finalized next chunk; a prefix of the window. Empty means "the
    /// window was too small to pick a confident boundary, widen it".
    pub accepted: String,
    /// Summary for the accepted chunk.
    pub accepted_summary: String,
    /// Running summary covering everything through the window.
    pub next_summary: String,
    /// Characters to discard from the start of the window before splitting
    /// resumes. May exceed the accepted length to also drop overlap or
    /// boilerplate.
    pub drop_len: usize,
}

impl ResplitDecision {
    pub fn is_merge_retry(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Text-generation collaborator behind the chunking engine: three blocking
/// request/response operations. Implementations are swappable; a failing
/// call must leave no state behind (the engine never advances on error).
pub trait Summarizer {
    /// Summarize the document's leading span (start of text through the
    /// end of the first candidate segment).
    fn initial_summary(&self, leading_span: &str, metadata: &Metadata)
        -> Result<String, SummarizerError>;

    /// Decide a boundary inside `window` given the running summary.
    fn resplit(
        &self,
        window: &str,
        running_summary: &str,
        metadata: &Metadata,
    ) -> Result<ResplitDecision, SummarizerError>;

    /// Summarize the final segment of a document.
    fn final_summary(
        &self,
        last_segment: &str,
        running_summary: &str,
        metadata: &Metadata,
    ) -> Result<String, SummarizerError>;
}
