//! In-memory cosine index over loaded chunks.
//!
//! The consumed retrieval interface: rank by cosine similarity, keep the
//! top k above a score threshold, optionally restricted to chunks whose
//! metadata carries an exact key/value match.

use serde_json::Value;
use std::cmp::Ordering;

use crate::chunker::Chunk;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0;
    let mut na = 0.0;
    let mut nb = 0.0;

    for i in 0..a.len().min(b.len()) {
        dot += a[i] * b[i];
        na += a[i] * a[i];
        nb += b[i] * b[i];
    }

    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }

    dot / (na.sqrt() * nb.sqrt())
}

struct Entry {
    vector: Vec<f32>,
    chunk: Chunk,
}

#[derive(Default)]
pub struct VectorIndex {
    entries: Vec<Entry>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, vector: Vec<f32>, chunk: Chunk) {
        self.entries.push(Entry { vector, chunk });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-k chunks by cosine similarity, best first, scores below
    /// `score_threshold` dropped.
    pub fn search(&self, query: &[f32], top_k: usize, score_threshold: f32) -> Vec<(&Chunk, f32)> {
        self.search_filtered(query, top_k, score_threshold, None)
    }

    /// Like [`search`](Self::search), optionally restricted to chunks
    /// whose metadata holds `value` under `key`.
    pub fn search_filtered(
        &self,
        query: &[f32],
        top_k: usize,
        score_threshold: f32,
        filter: Option<(&str, &Value)>,
    ) -> Vec<(&Chunk, f32)> {
        let mut scored: Vec<(&Chunk, f32)> = self
            .entries
            .iter()
            .filter(|entry| {
                filter.map_or(true, |(key, value)| {
                    entry.chunk.metadata.get(key) == Some(value)
                })
            })
            .map(|entry| (&entry.chunk, cosine_similarity(query, &entry.vector)))
            .filter(|(_, score)| *score >= score_threshold)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);
        scored
    }
}
