//! The context-propagating chunking loop.
//!
//! One engine run per document: split the remaining text into bounded
//! candidates, ask the summarizer to pick a boundary inside the first two,
//! emit the accepted chunk, advance the cursor, repeat. The running
//! summary carries document context from one decision into the next. The
//! loop exits only through the single-candidate branch, so every document
//! ends with exactly one final-summary chunk.

use thiserror::Error;

use super::events::{ChunkEvent, EventSink, TracingSink};
use super::splitter::BoundedSplitter;
use super::types::{Chunk, Document};
use crate::summarizer::{ResplitDecision, Summarizer, SummarizerError};

/// Default candidate size budget, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 4000;

/// Default overlap between consecutive candidates, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Per-document budget of merge-retry steps before the engine
    /// hard-splits at the first candidate boundary.
    pub max_merge_retries: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_merge_retries: 8,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Summarizer(#[from] SummarizerError),

    /// The capability returned a decision the protocol forbids. The engine
    /// rejects it instead of silently applying it.
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("document is empty after trimming")]
    EmptyDocument,
}

pub struct ChunkEngine<S> {
    splitter: BoundedSplitter,
    summarizer: S,
    max_merge_retries: usize,
}

impl<S: Summarizer> ChunkEngine<S> {
    pub fn new(summarizer: S) -> Self {
        Self::with_config(summarizer, EngineConfig::default())
    }

    pub fn with_config(summarizer: S, config: EngineConfig) -> Self {
        Self {
            splitter: BoundedSplitter::new(config.chunk_size, config.chunk_overlap),
            summarizer,
            max_merge_retries: config.max_merge_retries,
        }
    }

    pub fn summarizer(&self) -> &S {
        &self.summarizer
    }

    /// Split one document into summary-annotated chunks, reporting state
    /// transitions to the default tracing sink.
    pub fn split_document(&self, document: &Document) -> Result<Vec<Chunk>, EngineError> {
        self.split_document_with_events(document, &mut TracingSink)
    }

    /// Split one document, reporting every state transition to `sink`.
    pub fn split_document_with_events(
        &self,
        document: &Document,
        sink: &mut dyn EventSink,
    ) -> Result<Vec<Chunk>, EngineError> {
        let mut text = document.content.trim().to_string();
        if text.is_empty() {
            return Err(EngineError::EmptyDocument);
        }
        sink.emit(&ChunkEvent::DocumentStarted {
            chars: char_len(&text),
        });

        // The initial summary covers the document start through the end of
        // the first candidate, not the candidate alone: any prefix the
        // splitter stripped around separators stays in view.
        let mut candidates = self.splitter.split(&text);
        let first = candidates.first().ok_or(EngineError::EmptyDocument)?;
        let span_end = text
            .find(first.as_str())
            .map(|pos| pos + first.len())
            .unwrap_or(text.len());
        let span = &text[..span_end];
        let mut summary = self.summarizer.initial_summary(span, &document.metadata)?;
        sink.emit(&ChunkEvent::InitialSummary {
            span_chars: char_len(span),
        });
        sink.emit(&ChunkEvent::Split {
            candidates: candidates.len(),
        });

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut merges_left = self.max_merge_retries;

        loop {
            if candidates.is_empty() {
                return Err(EngineError::Protocol(
                    "remaining text exhausted before the terminal chunk".to_string(),
                ));
            }

            // SINGLE_CANDIDATE: the only exit from the loop.
            if candidates.len() == 1 {
                let last = &candidates[0];
                let last_summary =
                    self.summarizer
                        .final_summary(last, &summary, &document.metadata)?;
                let chars = char_len(last);
                chunks.push(Chunk::new(last.clone(), last_summary, &document.metadata));
                sink.emit(&ChunkEvent::ChunkEmitted {
                    index: chunks.len() - 1,
                    chars,
                });
                sink.emit(&ChunkEvent::DocumentFinished {
                    chunks: chunks.len(),
                });
                return Ok(chunks);
            }

            // MULTI_CANDIDATE: the window is the remaining-text prefix as
            // long as the first two candidates combined, so drop_len
            // offsets stay coherent with the cursor even under overlap.
            let window_chars = char_len(&candidates[0]) + char_len(&candidates[1]);
            let window = char_prefix(&text, window_chars);
            let decision = self
                .summarizer
                .resplit(window, &summary, &document.metadata)?;
            validate_decision(&decision, window)?;

            if decision.is_merge_retry() {
                if merges_left == 0 {
                    // Hard-split fallback: accept the first candidate as-is
                    // under the current running summary.
                    let forced = candidates[0].clone();
                    let forced_chars = char_len(&forced);
                    sink.emit(&ChunkEvent::MergeBudgetExhausted { forced_chars });
                    chunks.push(Chunk::new(forced, summary.clone(), &document.metadata));
                    sink.emit(&ChunkEvent::ChunkEmitted {
                        index: chunks.len() - 1,
                        chars: forced_chars,
                    });
                    text = advance(&text, forced_chars);
                    candidates = self.splitter.split(&text);
                    sink.emit(&ChunkEvent::Split {
                        candidates: candidates.len(),
                    });
                    continue;
                }

                // Merge-retry: widen the window, keep the cursor still.
                merges_left -= 1;
                sink.emit(&ChunkEvent::MergeRetry {
                    attempt: self.max_merge_retries - merges_left,
                    window_chars,
                });
                summary = decision.next_summary;
                let merged = format!("{}{}", candidates[0], candidates[1]);
                candidates.splice(0..2, [merged]);
                continue;
            }

            // EMIT, then advance the cursor past the dropped span.
            let chars = char_len(&decision.accepted);
            chunks.push(Chunk::new(
                decision.accepted,
                decision.accepted_summary,
                &document.metadata,
            ));
            sink.emit(&ChunkEvent::ChunkEmitted {
                index: chunks.len() - 1,
                chars,
            });
            text = advance(&text, decision.drop_len);
            if text.is_empty() {
                return Err(EngineError::Protocol(
                    "remaining text exhausted before the terminal chunk".to_string(),
                ));
            }
            summary = decision.next_summary;
            candidates = self.splitter.split(&text);
            sink.emit(&ChunkEvent::Split {
                candidates: candidates.len(),
            });
        }
    }
}

fn validate_decision(decision: &ResplitDecision, window: &str) -> Result<(), EngineError> {
    let window_chars = char_len(window);
    if decision.drop_len > window_chars {
        return Err(EngineError::Protocol(format!(
            "drop_len {} exceeds window length {}",
            decision.drop_len, window_chars
        )));
    }
    if char_len(&decision.accepted) > window_chars {
        return Err(EngineError::Protocol(
            "accepted chunk is longer than the window".to_string(),
        ));
    }
    if !decision.is_merge_retry() && decision.drop_len == 0 {
        return Err(EngineError::Protocol(
            "accepted a chunk without advancing (drop_len = 0)".to_string(),
        ));
    }
    Ok(())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Prefix of `text` spanning at most `chars` characters.
fn char_prefix(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((byte_pos, _)) => &text[..byte_pos],
        None => text,
    }
}

/// Remaining text after discarding `chars` characters, re-trimmed.
fn advance(text: &str, chars: usize) -> String {
    let rest = match text.char_indices().nth(chars) {
        Some((byte_pos, _)) => &text[byte_pos..],
        None => "",
    };
    rest.trim().to_string()
}
