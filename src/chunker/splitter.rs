//! Separator-hierarchy splitting with overlap.
//!
//! Cuts text at the coarsest separator that keeps segments under the size
//! budget: paragraph, then line, then sentence, then word, then a hard
//! character cut as last resort. Consecutive segments share up to
//! `overlap` characters of trailing context, subject to separator
//! alignment. All sizes are counted in characters, not bytes.

/// Default separator hierarchy, coarsest first. The empty string means
/// "split between characters" and must come last.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// Deterministic bounded splitter: a pure function of
/// `(text, max_size, overlap, separators)`.
#[derive(Debug, Clone)]
pub struct BoundedSplitter {
    max_size: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl BoundedSplitter {
    /// # Panics
    ///
    /// Panics if `max_size == 0` or `overlap >= max_size`.
    pub fn new(max_size: usize, overlap: usize) -> Self {
        Self::with_separators(max_size, overlap, DEFAULT_SEPARATORS)
    }

    pub fn with_separators(max_size: usize, overlap: usize, separators: &[&str]) -> Self {
        assert!(max_size > 0, "max_size must be > 0");
        assert!(overlap < max_size, "overlap must be smaller than max_size");
        assert!(!separators.is_empty(), "separators must not be empty");

        Self {
            max_size,
            overlap,
            separators: separators.iter().map(|&s| s.to_string()).collect(),
        }
    }

    /// Split `text` into an ordered sequence of segments, each at most
    /// `max_size` characters whenever a suitable separator exists below
    /// that size. Returns an empty sequence only for empty (or
    /// whitespace-only) input.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return vec![];
        }
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        // Coarsest separator actually present in the text wins; everything
        // finer stays available for oversized pieces.
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let pieces = split_on(text, separator);

        let mut segments = Vec::new();
        let mut good: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.max_size {
                good.push(piece);
                continue;
            }

            if !good.is_empty() {
                segments.extend(self.merge(&good, separator));
                good.clear();
            }

            if remaining.is_empty() {
                // No finer separator left; emit the oversized run as-is.
                segments.push(piece.to_string());
            } else {
                segments.extend(self.split_with(piece, remaining));
            }
        }

        if !good.is_empty() {
            segments.extend(self.merge(&good, separator));
        }

        segments
    }

    /// Greedily pack small pieces into segments of at most `max_size`
    /// characters, carrying a tail of up to `overlap` characters of prior
    /// pieces into the next segment.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);

        let mut segments = Vec::new();
        let mut window: Vec<&str> = Vec::new();
        let mut total = 0usize;

        for &piece in pieces {
            let piece_len = char_len(piece);
            let join_cost = if window.is_empty() { 0 } else { sep_len };

            if total + piece_len + join_cost > self.max_size && !window.is_empty() {
                if let Some(segment) = join_trimmed(&window, separator) {
                    segments.push(segment);
                }

                // Shrink the window to the overlap budget, and further if
                // the incoming piece would still not fit beside it.
                loop {
                    let join_cost = if window.is_empty() { 0 } else { sep_len };
                    let still_too_big = total + piece_len + join_cost > self.max_size && total > 0;
                    if total <= self.overlap && !still_too_big {
                        break;
                    }
                    let first = window.remove(0);
                    total -= char_len(first) + if window.is_empty() { 0 } else { sep_len };
                }
            }

            if !window.is_empty() {
                total += sep_len;
            }
            total += piece_len;
            window.push(piece);
        }

        if let Some(segment) = join_trimmed(&window, separator) {
            segments.push(segment);
        }

        segments
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split on `separator`, discarding it (it is re-inserted when merging).
/// An empty separator splits between every character.
fn split_on<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        let mut out = Vec::with_capacity(text.len());
        let mut iter = text.char_indices().peekable();
        while let Some((start, _)) = iter.next() {
            let end = iter.peek().map(|&(i, _)| i).unwrap_or(text.len());
            out.push(&text[start..end]);
        }
        out
    } else {
        text.split(separator)
            .filter(|piece| !piece.is_empty())
            .collect()
    }
}

fn join_trimmed(pieces: &[&str], separator: &str) -> Option<String> {
    let joined = pieces.join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
