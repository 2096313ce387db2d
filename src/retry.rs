//! Resilient call execution with retry, backoff and credential rotation
//!
//! Every outbound call to the search source goes through
//! [`call_with_rotation`], which composes three failure disciplines:
//!
//! - **Transient** failures (network errors, 5xx-equivalents) are retried in
//!   place with exponential backoff.
//! - **Quota** signals are never retried in place: the credential pool is
//!   rotated and the same logical request is re-issued with the new
//!   credential, counted against the same attempt budget.
//! - **Fatal** failures (bad request, non-quota denial) propagate
//!   immediately.
//!
//! Every retry loop is bounded twice: by `max_attempts` and by a wall-clock
//! `total_budget`. Non-credentialed calls (e.g. sink pushes) use the plain
//! [`execute_with_retry`] wrapper.

use crate::config::RetryConfig;
use crate::credentials::{CredentialHandle, CredentialPool};
use crate::error::{Error, SourceError};
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection resets, upstream 5xx) should
/// return `true`. Permanent failures (bad request, denied access, corrupt
/// data) should return `false`. Quota signals are deliberately *not*
/// retryable: they are handled by credential rotation instead.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Network errors are retryable when they look like connectivity issues
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            // The source tells us which of its failures are transient
            Error::Source(SourceError::Transient(_)) => true,
            // Quota signals rotate credentials instead of backing off
            Error::Source(_) => false,
            // I/O errors can be retryable in some cases
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // Exhaustion is fatal for the current call by design
            Error::CredentialsExhausted => false,
            // Database errors should not be retried (likely permanent)
            Error::Database(_) | Error::Sqlx(_) => false,
            // Config errors are permanent
            Error::Config { .. } => false,
            // Sink errors surface to the per-strategy handler, not the retry loop
            Error::Sink(_) => false,
            // Concurrency violations are immediate rejections
            Error::AlreadyRunning | Error::NoActiveRun => false,
            Error::NotFound(_) => false,
            Error::ShuttingDown => false,
            Error::Serialization(_) => false,
            Error::ApiServerError(_) => false,
            // Unknown errors - be conservative and don't retry
            Error::Other(_) => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic.
///
/// Used for outbound calls that do not consume pool credentials (sink
/// pushes). The loop is bounded by `config.max_attempts` total attempts and
/// by the `config.total_budget` wall clock, whichever trips first.
pub async fn execute_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let started = Instant::now();
    let mut delay = config.initial_delay;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                if started.elapsed() >= config.total_budget {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        budget_secs = config.total_budget.as_secs(),
                        "Retry wall-clock budget exhausted"
                    );
                    return Err(e);
                }

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                let jittered = if config.jitter { add_jitter(delay) } else { delay };
                tokio::time::sleep(jittered).await;

                delay = next_delay(delay, config);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Execute a credentialed call against the search source.
///
/// The operation receives a [`CredentialHandle`] and is re-invoked on retry,
/// possibly with a different credential after a quota rotation. Every
/// attempt's outcome is reported back to the pool. Rotation and backoff share
/// one attempt budget, so a call can never loop more than
/// `config.max_attempts` times regardless of failure mix.
pub async fn call_with_rotation<T, F, Fut>(
    pool: &CredentialPool,
    config: &RetryConfig,
    mut operation: F,
) -> crate::error::Result<T>
where
    F: FnMut(CredentialHandle) -> Fut,
    Fut: Future<Output = crate::error::Result<T>>,
{
    let started = Instant::now();
    let mut delay = config.initial_delay;
    let mut credential = pool.current()?;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match operation(credential.clone()).await {
            Ok(result) => {
                pool.record_outcome(credential.index, true, false);
                return Ok(result);
            }
            Err(e) if e.is_quota() => {
                pool.record_outcome(credential.index, false, true);

                if attempt >= config.max_attempts {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Quota rotation budget exhausted"
                    );
                    return Err(e);
                }

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    "Quota signal, rotating credential and re-issuing request"
                );

                // Exhaustion here is fatal and non-retryable for this call.
                credential = pool.rotate()?;
            }
            Err(e) if e.is_retryable() => {
                pool.record_outcome(credential.index, false, false);

                if attempt >= config.max_attempts || started.elapsed() >= config.total_budget {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Transient failure, retry budget exhausted"
                    );
                    return Err(e);
                }

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    delay_ms = delay.as_millis(),
                    "Transient failure, backing off"
                );

                let jittered = if config.jitter { add_jitter(delay) } else { delay };
                tokio::time::sleep(jittered).await;
                delay = next_delay(delay, config);

                // The pool may have reset or rotated while we slept.
                credential = pool.current()?;
            }
            Err(e) => {
                pool.record_outcome(credential.index, false, false);
                tracing::error!(error = %e, "Non-retryable source failure");
                return Err(e);
            }
        }
    }
}

fn next_delay(delay: Duration, config: &RetryConfig) -> Duration {
    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier).min(config.max_delay)
}

/// Add random jitter to a delay to prevent thundering herd.
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay is between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
