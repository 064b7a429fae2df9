use super::*;
use crate::summarizer::{ResplitDecision, Summarizer, SummarizerError};
use crate::retry::CallError;
use std::cell::RefCell;
use std::collections::VecDeque;

/// Deterministic stand-in for the remote capability: replays a script of
/// resplit decisions and records every call it receives.
struct ScriptedSummarizer {
    resplits: RefCell<VecDeque<ResplitDecision>>,
    /// When the script runs dry, answer with the merge-retry sentinel
    /// instead of panicking.
    merge_when_empty: bool,
    pub initial_spans: RefCell<Vec<String>>,
    pub resplit_windows: RefCell<Vec<String>>,
    pub resplit_summaries: RefCell<Vec<String>>,
    pub final_segments: RefCell<Vec<String>>,
}

impl ScriptedSummarizer {
    fn new(resplits: Vec<ResplitDecision>) -> Self {
        Self {
            resplits: RefCell::new(resplits.into()),
            merge_when_empty: false,
            initial_spans: RefCell::new(vec![]),
            resplit_windows: RefCell::new(vec![]),
            resplit_summaries: RefCell::new(vec![]),
            final_segments: RefCell::new(vec![]),
        }
    }

    fn always_merging() -> Self {
        let mut mock = Self::new(vec![]);
        mock.merge_when_empty = true;
        mock
    }
}

fn accept(accepted: &str, drop_len: usize, tag: &str) -> ResplitDecision {
    ResplitDecision {
        accepted: accepted.to_string(),
        accepted_summary: format!("summary-of-{tag}"),
        next_summary: format!("running-after-{tag}"),
        drop_len,
    }
}

fn merge_sentinel(tag: &str) -> ResplitDecision {
    ResplitDecision {
        accepted: String::new(),
        accepted_summary: String::new(),
        next_summary: format!("running-after-{tag}"),
        drop_len: 0,
    }
}

impl Summarizer for ScriptedSummarizer {
    fn initial_summary(&self, span: &str, _metadata: &Metadata) -> Result<String, SummarizerError> {
        self.initial_spans.borrow_mut().push(span.to_string());
        Ok("initial-summary".to_string())
    }

    fn resplit(
        &self,
        window: &str,
        running_summary: &str,
        _metadata: &Metadata,
    ) -> Result<ResplitDecision, SummarizerError> {
        self.resplit_windows.borrow_mut().push(window.to_string());
        self.resplit_summaries
            .borrow_mut()
            .push(running_summary.to_string());
        match self.resplits.borrow_mut().pop_front() {
            Some(decision) => Ok(decision),
            None if self.merge_when_empty => Ok(merge_sentinel("dry")),
            None => panic!("resplit called more times than scripted"),
        }
    }

    fn final_summary(
        &self,
        segment: &str,
        _running_summary: &str,
        _metadata: &Metadata,
    ) -> Result<String, SummarizerError> {
        self.final_segments.borrow_mut().push(segment.to_string());
        Ok("final-summary".to_string())
    }
}

struct FailingSummarizer;

impl Summarizer for FailingSummarizer {
    fn initial_summary(&self, _: &str, _: &Metadata) -> Result<String, SummarizerError> {
        Err(SummarizerError::Call(CallError::Transient(
            "capability offline".to_string(),
        )))
    }

    fn resplit(&self, _: &str, _: &str, _: &Metadata) -> Result<ResplitDecision, SummarizerError> {
        Err(SummarizerError::Call(CallError::Transient(
            "capability offline".to_string(),
        )))
    }

    fn final_summary(&self, _: &str, _: &str, _: &Metadata) -> Result<String, SummarizerError> {
        Err(SummarizerError::Call(CallError::Transient(
            "capability offline".to_string(),
        )))
    }
}

fn config(chunk_size: usize, overlap: usize) -> EngineConfig {
    EngineConfig {
        chunk_size,
        chunk_overlap: overlap,
        max_merge_retries: 8,
    }
}

fn doc_metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("filename".into(), "ch1.txt".into());
    metadata
}

// ---------------------------------------------------------------------------
// Splitter
// ---------------------------------------------------------------------------

#[test]
fn test_splitter_empty_input() {
    let splitter = BoundedSplitter::new(100, 10);
    assert!(splitter.split("").is_empty());
}

#[test]
fn test_splitter_small_text_single_segment() {
    let splitter = BoundedSplitter::new(100, 10);
    let segments = splitter.split("Just a short note.");
    assert_eq!(segments, vec!["Just a short note.".to_string()]);
}

#[test]
fn test_splitter_respects_max_size() {
    let splitter = BoundedSplitter::new(40, 10);
    let text = "The quick brown fox jumps over the lazy dog. \
                Pack my box with five dozen liquor jugs. \
                How vexingly quick daft zebras jump.";
    let segments = splitter.split(text);

    assert!(segments.len() >= 3);
    for segment in &segments {
        assert!(
            segment.chars().count() <= 40,
            "segment too long: {} chars",
            segment.chars().count()
        );
    }
}

#[test]
fn test_splitter_prefers_paragraph_boundaries() {
    let splitter = BoundedSplitter::new(60, 0);
    let text = "First paragraph stands alone.\n\nSecond paragraph also stands alone.";
    let segments = splitter.split(text);

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0], "First paragraph stands alone.");
    assert_eq!(segments[1], "Second paragraph also stands alone.");
}

#[test]
fn test_splitter_hard_cut_without_separators() {
    let splitter = BoundedSplitter::new(400, 50);
    let text = "x".repeat(1000);
    let segments = splitter.split(&text);

    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0].len(), 400);
    assert_eq!(segments[1].len(), 400);
    // Last segment carries the 50-char overlap tail plus the 300 remaining.
    assert!(segments[2].len() <= 400);
}

#[test]
fn test_splitter_overlap_carries_tail() {
    let splitter = BoundedSplitter::new(400, 50);
    // Distinct characters so shared context is observable.
    let text: String = (0..1000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let segments = splitter.split(&text);

    assert!(segments.len() >= 2);
    let tail: String = segments[0].chars().rev().take(50).collect::<Vec<_>>()
        .into_iter().rev().collect();
    assert!(
        segments[1].starts_with(&tail),
        "second segment should start with the first segment's 50-char tail"
    );
}

#[test]
fn test_splitter_deterministic() {
    let splitter = BoundedSplitter::new(80, 20);
    let text = "Alpha beta gamma.\n\nDelta epsilon zeta eta theta iota kappa.\nLambda mu.";
    assert_eq!(splitter.split(text), splitter.split(text));
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[test]
fn test_engine_two_chunk_run() {
    // 1000 unbroken chars -> candidates of 400/400/300 (50-char overlap).
    let text = "x".repeat(1000);
    let document = Document::with_metadata(text.clone(), doc_metadata());

    // Window = first two candidates = 800-char prefix. The capability
    // accepts 420 chars and drops 650 (overlap it judged redundant), so a
    // single 350-char candidate remains and the run finishes at two chunks.
    let mock = ScriptedSummarizer::new(vec![accept(&text[..420], 650, "one")]);
    let engine = ChunkEngine::with_config(mock, config(400, 50));

    let mut sink = CollectSink::default();
    let chunks = engine
        .split_document_with_events(&document, &mut sink)
        .unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content.len(), 420);
    assert_eq!(chunks[0].summary(), Some("summary-of-one"));
    assert_eq!(chunks[1].content.len(), 350);
    assert_eq!(chunks[1].summary(), Some("final-summary"));

    // Metadata is copied per chunk with the summary injected.
    for chunk in &chunks {
        assert_eq!(chunk.metadata.get("filename").unwrap(), "ch1.txt");
    }

    assert!(sink.events.contains(&ChunkEvent::DocumentStarted { chars: 1000 }));
    assert!(sink.events.contains(&ChunkEvent::DocumentFinished { chunks: 2 }));
}

#[test]
fn test_engine_window_is_first_two_candidates() {
    let text = "x".repeat(1000);
    let document = Document::new(text.clone());

    let mock = ScriptedSummarizer::new(vec![accept(&text[..420], 650, "one")]);
    let engine = ChunkEngine::with_config(mock, config(400, 50));
    let chunks = engine.split_document(&document).unwrap();
    assert_eq!(chunks.len(), 2);

    let windows = engine_windows(&engine);
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].len(), 800);
    assert!(text.starts_with(&windows[0]));
}

fn engine_windows(engine: &ChunkEngine<ScriptedSummarizer>) -> Vec<String> {
    engine.summarizer().resplit_windows.borrow().clone()
}

#[test]
fn test_engine_initial_span_covers_document_start() {
    // Leading whitespace is trimmed; the initial-summary span runs from
    // the trimmed start through the end of the first candidate.
    let text = format!("   {}", "y".repeat(600));
    let document = Document::new(text);

    let mock = ScriptedSummarizer::new(vec![accept(&"y".repeat(210), 210, "one")]);
    let engine = ChunkEngine::with_config(mock, config(400, 50));
    engine.split_document(&document).unwrap();

    let spans = engine.summarizer().initial_spans.borrow().clone();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0], "y".repeat(400));
}

#[test]
fn test_engine_coverage_reconstruction() {
    // With drop_len == accepted length on unbroken text, emitted contents
    // concatenate back to the original document.
    let text = "z".repeat(900);
    let document = Document::new(text.clone());

    let mock = ScriptedSummarizer::new(vec![
        accept(&text[..350], 350, "one"),
        accept(&text[350..700], 350, "two"),
    ]);
    let engine = ChunkEngine::with_config(mock, config(400, 0));
    let chunks = engine.split_document(&document).unwrap();

    let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(rebuilt, text);
}

#[test]
fn test_engine_exactly_one_terminal_chunk() {
    let text = "z".repeat(900);
    let document = Document::new(text.clone());

    let mock = ScriptedSummarizer::new(vec![
        accept(&text[..350], 350, "one"),
        accept(&text[350..700], 350, "two"),
    ]);
    let engine = ChunkEngine::with_config(mock, config(400, 0));
    let chunks = engine.split_document(&document).unwrap();

    let finals = engine.summarizer().final_segments.borrow().clone();
    assert_eq!(finals.len(), 1, "final summary must run exactly once");
    // ... and it produced the last chunk.
    assert_eq!(chunks.last().unwrap().content, finals[0]);
}

#[test]
fn test_engine_merge_retry_keeps_cursor() {
    let text = "x".repeat(1000);
    let document = Document::new(text.clone());

    let mock = ScriptedSummarizer::new(vec![
        merge_sentinel("merge"),
        accept(&text[..500], 700, "one"),
    ]);
    let engine = ChunkEngine::with_config(mock, config(400, 50));

    let mut sink = CollectSink::default();
    let chunks = engine
        .split_document_with_events(&document, &mut sink)
        .unwrap();

    let windows = engine_windows(&engine);
    assert_eq!(windows.len(), 2);
    // First window: candidates 400 + 400. After the merge the first
    // candidate is 800 chars and its partner the 300-char tail; the
    // cursor did not move, so both windows are prefixes of the document.
    assert_eq!(windows[0].len(), 800);
    assert_eq!(windows[1].len(), 1000);
    assert!(text.starts_with(&windows[1]));

    // The running summary advanced to the sentinel's next_summary.
    let summaries = engine.summarizer().resplit_summaries.borrow().clone();
    assert_eq!(summaries[0], "initial-summary");
    assert_eq!(summaries[1], "running-after-merge");

    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, ChunkEvent::MergeRetry { attempt: 1, .. })));
    assert_eq!(chunks.len(), 2);
}

#[test]
fn test_engine_rejects_drop_beyond_window() {
    let text = "x".repeat(1000);
    let document = Document::new(text.clone());

    let mock = ScriptedSummarizer::new(vec![accept(&text[..100], 801, "bad")]);
    let engine = ChunkEngine::with_config(mock, config(400, 50));

    match engine.split_document(&document) {
        Err(EngineError::Protocol(msg)) => assert!(msg.contains("drop_len")),
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[test]
fn test_engine_rejects_zero_drop_progress() {
    let text = "x".repeat(1000);
    let document = Document::new(text.clone());

    let mock = ScriptedSummarizer::new(vec![accept(&text[..100], 0, "stuck")]);
    let engine = ChunkEngine::with_config(mock, config(400, 50));

    assert!(matches!(
        engine.split_document(&document),
        Err(EngineError::Protocol(_))
    ));
}

#[test]
fn test_engine_rejects_full_window_consumption_without_tail() {
    // Dropping everything leaves nothing for the terminal chunk.
    let text = "x".repeat(700);
    let document = Document::new(text.clone());

    let mock = ScriptedSummarizer::new(vec![accept(&text[..700], 700, "all")]);
    let engine = ChunkEngine::with_config(mock, config(400, 0));

    assert!(matches!(
        engine.split_document(&document),
        Err(EngineError::Protocol(_))
    ));
}

#[test]
fn test_engine_merge_budget_forces_hard_split() {
    let text = "x".repeat(1000);
    let document = Document::new(text.clone());

    let mock = ScriptedSummarizer::always_merging();
    let engine = ChunkEngine::with_config(
        mock,
        EngineConfig {
            chunk_size: 400,
            chunk_overlap: 0,
            max_merge_retries: 1,
        },
    );

    let mut sink = CollectSink::default();
    let chunks = engine
        .split_document_with_events(&document, &mut sink)
        .unwrap();

    // The run terminates despite a capability that never picks a boundary.
    assert!(!chunks.is_empty());
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, ChunkEvent::MergeBudgetExhausted { .. })));
    assert_eq!(engine.summarizer().final_segments.borrow().len(), 1);

    let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(rebuilt, text);
}

#[test]
fn test_engine_deterministic_across_runs() {
    let text = "x".repeat(1000);
    let document = Document::with_metadata(text.clone(), doc_metadata());

    let run = || {
        let mock = ScriptedSummarizer::new(vec![accept(&text[..420], 650, "one")]);
        let engine = ChunkEngine::with_config(mock, config(400, 50));
        engine.split_document(&document).unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.content, b.content);
        assert_eq!(a.metadata, b.metadata);
    }
}

#[test]
fn test_engine_empty_document_rejected() {
    let engine = ChunkEngine::with_config(ScriptedSummarizer::new(vec![]), config(400, 50));
    assert!(matches!(
        engine.split_document(&Document::new("")),
        Err(EngineError::EmptyDocument)
    ));
    assert!(matches!(
        engine.split_document(&Document::new("   \n\n  ")),
        Err(EngineError::EmptyDocument)
    ));
}

#[test]
fn test_engine_capability_failure_aborts_run() {
    let engine = ChunkEngine::with_config(FailingSummarizer, config(400, 50));
    let document = Document::new("x".repeat(1000));

    assert!(matches!(
        engine.split_document(&document),
        Err(EngineError::Summarizer(_))
    ));
}

#[test]
fn test_single_candidate_document_goes_straight_to_final() {
    let document = Document::new("One small document.");
    let engine = ChunkEngine::with_config(ScriptedSummarizer::new(vec![]), config(400, 50));

    let chunks = engine.split_document(&document).unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, "One small document.");
    assert_eq!(chunks[0].summary(), Some("final-summary"));
    assert!(engine.summarizer().resplit_windows.borrow().is_empty());
}
