// client.rs - the HTTP summarizer, an OpenAI-style chat-completions endpoint
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::warn;

use super::protocol::{
    self, ChatMessage, ChatRequest, ChatResponse, FailureMode,
};
use super::{ResplitDecision, Summarizer, SummarizerError};
use crate::chunker::Metadata;
use crate::retry::{parse_retry_after, with_retry, CallError, RetryPolicy};

pub struct RemoteSummarizer {
    http: Client,
    base_url: String,
    model: String,
    retry: RetryPolicy,
    failure_mode: FailureMode,
}

impl RemoteSummarizer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_options(
            base_url,
            "qwen3-1.7b",
            RetryPolicy::default(),
            FailureMode::default(),
        )
    }

    pub fn with_options(
        base_url: impl Into<String>,
        model: impl Into<String>,
        retry: RetryPolicy,
        failure_mode: FailureMode,
    ) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(180)) // LLM generation is slow
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            retry,
            failure_mode,
        }
    }

    /// One request/response round-trip, classified into retry classes.
    fn send(&self, messages: &[ChatMessage]) -> Result<String, CallError> {
        let req = ChatRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&req)
            .send()
            .map_err(|e| CallError::Transient(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().unwrap_or_default();
            return Err(CallError::RateLimited {
                retry_after: parse_retry_after(&body),
            });
        }
        if status == StatusCode::BAD_REQUEST {
            let body = response.text().unwrap_or_default();
            return Err(CallError::BadRequest(body));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CallError::Transient(format!("status {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| CallError::Transient(format!("undecodable response body: {e}")))?;

        // A reply without content (e.g. filtered) degrades to empty text
        // rather than killing a long batch run.
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        match content {
            Some(text) => Ok(text),
            None => {
                warn!("response carried no content, substituting empty text");
                Ok(String::new())
            }
        }
    }

    fn generate(&self, messages: Vec<ChatMessage>) -> Result<String, SummarizerError> {
        with_retry(&self.retry, || self.send(&messages)).map_err(SummarizerError::Call)
    }

    fn summary_from(&self, reply: &str, operation: &str) -> Result<String, SummarizerError> {
        match protocol::parse_summary(reply) {
            Some(summary) => Ok(summary),
            None => match self.failure_mode {
                FailureMode::Soft => {
                    warn!("{operation}: reply missing <summary> tag, using empty summary");
                    Ok(String::new())
                }
                FailureMode::Fast => Err(SummarizerError::MalformedResponse {
                    operation: operation.to_string(),
                    detail: "missing <summary> tag".to_string(),
                }),
            },
        }
    }
}

impl Summarizer for RemoteSummarizer {
    fn initial_summary(
        &self,
        leading_span: &str,
        _metadata: &Metadata,
    ) -> Result<String, SummarizerError> {
        let reply = self.generate(protocol::initial_summary_messages(leading_span))?;
        self.summary_from(&reply, "initial_summary")
    }

    fn resplit(
        &self,
        window: &str,
        running_summary: &str,
        _metadata: &Metadata,
    ) -> Result<ResplitDecision, SummarizerError> {
        let reply = self.generate(protocol::resplit_messages(window, running_summary))?;
        match protocol::parse_resplit(&reply) {
            Some(decision) => Ok(decision),
            None => match self.failure_mode {
                // The merge-retry sentinel is the safe degraded answer: it
                // never advances the cursor, so one bad reply cannot drop
                // document text.
                FailureMode::Soft => {
                    warn!("resplit: undecodable reply, degrading to merge-retry");
                    Ok(ResplitDecision {
                        accepted: String::new(),
                        accepted_summary: String::new(),
                        next_summary: running_summary.to_string(),
                        drop_len: 0,
                    })
                }
                FailureMode::Fast => Err(SummarizerError::MalformedResponse {
                    operation: "resplit".to_string(),
                    detail: "missing or invalid decision tags".to_string(),
                }),
            },
        }
    }

    fn final_summary(
        &self,
        last_segment: &str,
        running_summary: &str,
        _metadata: &Metadata,
    ) -> Result<String, SummarizerError> {
        let reply = self.generate(protocol::final_summary_messages(last_segment, running_summary))?;
        self.summary_from(&reply, "final_summary")
    }
}
