// retry.rs - one retry policy shared by every network-bound client
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tracing::warn;

/// Failure classes for a single blocking call against a remote collaborator.
#[derive(Debug, Error)]
pub enum CallError {
    /// The server asked us to slow down. `retry_after`, when present, was
    /// parsed out of the error body and already includes the safety buffer.
    #[error("rate limited by server")]
    RateLimited { retry_after: Option<Duration> },

    /// The request itself is malformed; retrying cannot help.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Anything else (network hiccup, 5xx, timeout). Retried with backoff.
    #[error("transient failure: {0}")]
    Transient(String),
}

/// How long to wait between attempts.
#[derive(Debug, Clone, Copy)]
pub enum Backoff {
    /// `unit * attempt_number`
    Linear { unit: Duration },
    /// `factor ^ attempt_number` seconds
    Exponential { factor: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::Linear {
                unit: Duration::from_secs(60),
            },
        }
    }
}

impl RetryPolicy {
    pub fn linear(max_attempts: usize, unit: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Linear { unit },
        }
    }

    pub fn exponential(max_attempts: usize, factor: f64) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential { factor },
        }
    }

    /// Delay before the next try, given the 1-based number of failed attempts.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        match self.backoff {
            Backoff::Linear { unit } => unit * attempt as u32,
            Backoff::Exponential { factor } => Duration::from_secs_f64(factor.powi(attempt as i32)),
        }
    }
}

/// Extra seconds added on top of a server-suggested wait.
const RATE_LIMIT_BUFFER_SECS: u64 = 3;

/// Parse a server-suggested wait time out of rate-limit error text, e.g.
/// "... Try again in 10 seconds. ...". Returns the suggested wait plus a
/// 3-second buffer, or None if the body carries no suggestion.
pub fn parse_retry_after(body: &str) -> Option<Duration> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"Try again in (\d+) seconds").unwrap());

    let captures = re.captures(body)?;
    let secs: u64 = captures.get(1)?.as_str().parse().ok()?;
    Some(Duration::from_secs(secs + RATE_LIMIT_BUFFER_SECS))
}

/// Run `op` until it succeeds, the attempt budget is spent, or a
/// non-retryable failure shows up.
///
/// Rate-limited attempts sleep for the server-suggested wait when one was
/// parsed, otherwise for the policy's computed delay. Bad requests are
/// returned immediately. Every failed attempt counts against
/// `max_attempts`.
pub fn with_retry<T, F>(policy: &RetryPolicy, mut op: F) -> Result<T, CallError>
where
    F: FnMut() -> Result<T, CallError>,
{
    let mut attempt = 0;

    loop {
        let err = match op() {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        attempt += 1;

        match err {
            CallError::BadRequest(msg) => {
                warn!("request rejected, not retrying: {msg}");
                return Err(CallError::BadRequest(msg));
            }
            CallError::RateLimited { retry_after } if attempt < policy.max_attempts => {
                let wait = retry_after.unwrap_or_else(|| policy.delay_for(attempt));
                warn!(
                    "rate limited, waiting {:.1}s before attempt {}",
                    wait.as_secs_f64(),
                    attempt + 1
                );
                std::thread::sleep(wait);
            }
            CallError::Transient(msg) if attempt < policy.max_attempts => {
                let wait = policy.delay_for(attempt);
                warn!(
                    "attempt {attempt} failed ({msg}), retrying in {:.1}s",
                    wait.as_secs_f64()
                );
                std::thread::sleep(wait);
            }
            err => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_linear_delay_scales_with_attempts() {
        let policy = RetryPolicy::linear(5, Duration::from_secs(60));
        assert_eq!(policy.delay_for(1), Duration::from_secs(60));
        assert_eq!(policy.delay_for(3), Duration::from_secs(180));
    }

    #[test]
    fn test_exponential_delay() {
        let policy = RetryPolicy::exponential(5, 2.0);
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(16));
    }

    #[test]
    fn test_parse_retry_after_adds_buffer() {
        let body = r#"{"error": {"message": "Rate limit reached. Try again in 10 seconds."}}"#;
        assert_eq!(parse_retry_after(body), Some(Duration::from_secs(13)));
    }

    #[test]
    fn test_parse_retry_after_missing() {
        assert_eq!(parse_retry_after("internal server error"), None);
    }

    #[test]
    fn test_retry_succeeds_after_transient_failures() {
        let policy = RetryPolicy::linear(5, Duration::from_millis(1));
        let calls = Cell::new(0);

        let result = with_retry(&policy, || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(CallError::Transient("boom".into()))
            } else {
                Ok(42)
            }
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_retry_gives_up_at_attempt_ceiling() {
        let policy = RetryPolicy::linear(3, Duration::from_millis(1));
        let calls = Cell::new(0);

        let result: Result<(), _> = with_retry(&policy, || {
            calls.set(calls.get() + 1);
            Err(CallError::Transient("still down".into()))
        });

        assert!(matches!(result, Err(CallError::Transient(_))));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_bad_request_fails_fast() {
        let policy = RetryPolicy::linear(5, Duration::from_millis(1));
        let calls = Cell::new(0);

        let result: Result<(), _> = with_retry(&policy, || {
            calls.set(calls.get() + 1);
            Err(CallError::BadRequest("unsupported field".into()))
        });

        assert!(matches!(result, Err(CallError::BadRequest(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_rate_limit_honors_suggested_wait() {
        let policy = RetryPolicy::linear(5, Duration::from_secs(60));
        let calls = Cell::new(0);

        // Suggested wait is tiny so the test stays fast; the point is that
        // the suggested value is used instead of the 60s linear delay.
        let result = with_retry(&policy, || {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(CallError::RateLimited {
                    retry_after: Some(Duration::from_millis(5)),
                })
            } else {
                Ok("ok")
            }
        });

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.get(), 2);
    }
}
