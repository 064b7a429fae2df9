//! Structured engine observability.
//!
//! One event per state transition, pushed through an [`EventSink`] instead
//! of console narration. Sinks are machine-consumable; the default one
//! forwards to `tracing`.

use tracing::{debug, warn};

/// One engine state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkEvent {
    /// A document run started; `chars` is the trimmed document length.
    DocumentStarted { chars: usize },
    /// The leading span was summarized into the initial running summary.
    InitialSummary { span_chars: usize },
    /// The splitter produced a fresh candidate sequence.
    Split { candidates: usize },
    /// A chunk was finalized and appended to the output.
    ChunkEmitted { index: usize, chars: usize },
    /// The capability declined to pick a boundary; the first two
    /// candidates were merged and the cursor left untouched.
    MergeRetry { attempt: usize, window_chars: usize },
    /// The per-document merge-retry budget ran out; the first candidate
    /// was force-accepted as a hard split.
    MergeBudgetExhausted { forced_chars: usize },
    /// The last candidate was summarized and emitted; the run is over.
    DocumentFinished { chunks: usize },
}

/// Receives engine events as they happen.
pub trait EventSink {
    fn emit(&mut self, event: &ChunkEvent);
}

/// Default sink: forwards events to `tracing` at debug level, except the
/// degraded merge-budget path which warns.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: &ChunkEvent) {
        match event {
            ChunkEvent::MergeBudgetExhausted { forced_chars } => {
                warn!("merge-retry budget exhausted, hard-splitting {forced_chars} chars");
            }
            other => debug!(?other, "chunking"),
        }
    }
}

/// Test/inspection sink that records every event in order.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub events: Vec<ChunkEvent>,
}

impl EventSink for CollectSink {
    fn emit(&mut self, event: &ChunkEvent) {
        self.events.push(event.clone());
    }
}
