//! Wire protocol for the remote summarizer: the three prompt shapes and
//! the tagged-field reply format they ask for.

use serde::{Deserialize, Serialize};

use super::ResplitDecision;

/// What to do when a reply does not carry the expected fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Degrade to an empty summary (or a merge-retry decision) and log a
    /// warning; keeps long batch runs alive across one bad reply.
    #[default]
    Soft,
    /// Surface a typed error and abort the document run.
    Fast,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoiceMessage {
    pub content: Option<String>,
}

const SUMMARY_SYSTEM: &str = "You summarize document fragments for a retrieval index. \
    Reply with the summary wrapped in <summary>...</summary> tags and nothing else.";

const RESPLIT_SYSTEM: &str = "You choose chunk boundaries inside document fragments. \
    Given a fragment and a summary of everything before it, pick the best boundary, \
    then reply with exactly these tags:\n\
    <first_chunk>the text before the boundary, copied verbatim; leave empty if the \
    fragment is too short to decide</first_chunk>\n\
    <first_chunk_summary>summary of the first chunk in its document context</first_chunk_summary>\n\
    <second_chunk_summary>summary of everything up to and including this fragment</second_chunk_summary>\n\
    <dropped_len>number of characters, counted from the start of the fragment, that \
    the next chunk should skip</dropped_len>";

pub fn initial_summary_messages(leading_span: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SUMMARY_SYSTEM),
        ChatMessage::user(format!(
            "Summarize the opening part of this document:\n\n{leading_span}"
        )),
    ]
}

pub fn resplit_messages(window: &str, running_summary: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(RESPLIT_SYSTEM),
        ChatMessage::user(format!(
            "Summary of the document so far:\n{running_summary}\n\nFragment:\n{window}"
        )),
    ]
}

pub fn final_summary_messages(last_segment: &str, running_summary: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SUMMARY_SYSTEM),
        ChatMessage::user(format!(
            "Summary of the document so far:\n{running_summary}\n\n\
             Summarize this closing part of the document:\n\n{last_segment}"
        )),
    ]
}

/// Extract `<summary>...</summary>` from a reply.
pub fn parse_summary(reply: &str) -> Option<String> {
    tagged(reply, "summary").map(|s| s.trim().to_string())
}

/// Extract a full resplit decision. Returns None when any required field
/// is missing or `dropped_len` is not a number; an empty `first_chunk` tag
/// is valid and means merge-retry.
pub fn parse_resplit(reply: &str) -> Option<ResplitDecision> {
    let accepted = tagged(reply, "first_chunk")?.trim().to_string();
    let accepted_summary = tagged(reply, "first_chunk_summary")?.trim().to_string();
    let next_summary = tagged(reply, "second_chunk_summary")?.trim().to_string();
    let drop_len: usize = tagged(reply, "dropped_len")?.trim().parse().ok()?;

    Some(ResplitDecision {
        accepted,
        accepted_summary,
        next_summary,
        drop_len,
    })
}

fn tagged<'a>(reply: &'a str, name: &str) -> Option<&'a str> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let start = reply.find(&open)? + open.len();
    let end = reply[start..].find(&close)? + start;
    Some(&reply[start..end])
}
