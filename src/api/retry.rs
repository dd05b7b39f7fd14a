use std::{future::Future, time::Duration};

use tracing::warn;

use crate::api::{
    error::ApiError,
    transport::{RawResponse, TransportError}
};

/// Source of delays for the retry loop.
pub trait Clock {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

/// What a single attempt amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    Success(String),
    RateLimited,
    Unavailable,
    Timeout,
    ConnectionFailed,
    Fatal(AttemptError)
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptError {
    Status { status: u16, body: String },
    Transport(String)
}

impl Attempt {
    pub fn classify(result: Result<RawResponse, TransportError>) -> Attempt {
        match result {
            Ok(RawResponse { status, body }) => match status {
                200..=299 => Attempt::Success(body),
                429 => Attempt::RateLimited,
                503 => Attempt::Unavailable,
                _ => Attempt::Fatal(AttemptError::Status { status, body })
            },
            Err(TransportError::Timeout) => Attempt::Timeout,
            Err(TransportError::Connect(_)) => Attempt::ConnectionFailed,
            Err(TransportError::Other(message)) => Attempt::Fatal(AttemptError::Transport(message))
        }
    }
}

/// What to do after an attempt
#[derive(Debug)]
pub enum Decision {
    Retry(Duration),
    Done(String),
    Fail(ApiError)
}

/// Counters for one request's retry loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Consecutive 429s, wrapping back to zero once the cap is hit
    pub rate_limit_hits: u32,
    pub timeouts: u32,
    pub connection_failures: u32
}

/// # Transport retry policy
///
/// - 429: `rate_limit_base * 2^n` for the n-th consecutive hit, where n
///   wraps to 0 after `rate_limit_reset_after` hits. Never fatal.
/// - 503: fixed `unavailable_delay`, retried without limit.
/// - Timeout: `timeout_base * 2^min(k, timeout_exponent_cap)` for the k-th
///   timeout, fatal once `max_retries` is exceeded.
/// - Connection failure: fixed `connection_delay`, fatal once
///   `max_retries` is exceeded.
/// - Anything else is returned to the caller immediately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub rate_limit_base: Duration,
    pub rate_limit_reset_after: u32,
    pub unavailable_delay: Duration,
    pub timeout_base: Duration,
    pub timeout_exponent_cap: u32,
    pub connection_delay: Duration,
    pub max_retries: u32
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            rate_limit_base: Duration::from_secs(30),
            rate_limit_reset_after: 10,
            unavailable_delay: Duration::from_secs(60),
            timeout_base: Duration::from_secs(5),
            timeout_exponent_cap: 6,
            connection_delay: Duration::from_secs(30),
            max_retries: 5
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            ..RetryPolicy::default()
        }
    }

    /// Delay for the next 429, advancing the counter.
    pub fn next_rate_limit_delay(&self, state: &mut RetryState) -> Duration {
        if state.rate_limit_hits >= self.rate_limit_reset_after {
            state.rate_limit_hits = 0;
        }

        let delay = backoff(self.rate_limit_base, state.rate_limit_hits);
        state.rate_limit_hits += 1;
        delay
    }

    pub fn timeout_delay(&self, timeouts: u32) -> Duration {
        backoff(self.timeout_base, timeouts.min(self.timeout_exponent_cap))
    }

    pub fn decide(&self, state: &mut RetryState, attempt: Attempt) -> Decision {
        match attempt {
            Attempt::Success(body) => Decision::Done(body),
            Attempt::RateLimited => Decision::Retry(self.next_rate_limit_delay(state)),
            Attempt::Unavailable => Decision::Retry(self.unavailable_delay),
            Attempt::Timeout => {
                state.timeouts += 1;
                if state.timeouts > self.max_retries {
                    return Decision::Fail(ApiError::Timeout {
                        attempts: state.timeouts
                    });
                }

                Decision::Retry(self.timeout_delay(state.timeouts))
            }
            Attempt::ConnectionFailed => {
                state.connection_failures += 1;
                if state.connection_failures > self.max_retries {
                    return Decision::Fail(ApiError::Connection {
                        attempts: state.connection_failures
                    });
                }

                Decision::Retry(self.connection_delay)
            }
            Attempt::Fatal(AttemptError::Status { status, body }) => Decision::Fail(ApiError::Status { status, body }),
            Attempt::Fatal(AttemptError::Transport(message)) => Decision::Fail(ApiError::Transport(message))
        }
    }

    /// Runs `send` until it succeeds or the policy gives up, sleeping on
    /// `clock` between attempts. Returns the successful response body.
    pub async fn run<C, F, Fut>(&self, clock: &C, mut send: F) -> Result<String, ApiError>
    where
        C: Clock,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RawResponse, TransportError>>
    {
        let mut state = RetryState::default();

        loop {
            let attempt = Attempt::classify(send().await);
            let reason = match &attempt {
                Attempt::RateLimited => "Rate limit exceeded",
                Attempt::Unavailable => "Service unavailable",
                Attempt::Timeout => "Read timeout",
                Attempt::ConnectionFailed => "Connection error",
                _ => ""
            };

            match self.decide(&mut state, attempt) {
                Decision::Done(body) => return Ok(body),
                Decision::Fail(e) => return Err(e),
                Decision::Retry(delay) => {
                    warn!("{reason}. Waiting for {} seconds before retrying...", delay.as_secs_f64());
                    clock.sleep(delay).await;
                }
            }
        }
    }
}

/// `base * 2^exponent`, saturating at [`Duration::MAX`].
fn backoff(base: Duration, exponent: u32) -> Duration {
    2u32.checked_pow(exponent)
        .and_then(|factor| base.checked_mul(factor))
        .unwrap_or(Duration::MAX)
}
