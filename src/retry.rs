// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff for collaborator calls.
//!
//! Both the Kubernetes inventory scan and the DNS provider adapters go through
//! [`retry_with_backoff`]. Transient failures (HTTP 429, 5xx, connection errors) are
//! retried with jittered exponential backoff; permanent failures return immediately.
//! The reconciliation core itself never retries.

use anyhow::Result;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Maximum total time to spend retrying Kubernetes calls (5 minutes)
const MAX_ELAPSED_TIME_SECS: u64 = 300;

/// Initial Kubernetes retry interval (100ms)
const INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Maximum interval between Kubernetes retries (30 seconds)
const MAX_INTERVAL_SECS: u64 = 30;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Initial provider API retry interval (50ms)
const HTTP_INITIAL_INTERVAL_MILLIS: u64 = 50;

/// Maximum interval between provider API retries (10 seconds)
const HTTP_MAX_INTERVAL_SECS: u64 = 10;

/// Maximum total time to spend retrying provider API calls (2 minutes)
const HTTP_MAX_ELAPSED_TIME_SECS: u64 = 120;

/// Exponential backoff with jitter.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    /// Interval returned by the next call to [`next_backoff`](Self::next_backoff), before jitter
    pub current_interval: Duration,
    /// First interval
    pub initial_interval: Duration,
    /// Upper bound for a single interval
    pub max_interval: Duration,
    /// Upper bound for the whole retry sequence
    pub max_elapsed_time: Option<Duration>,
    /// Growth factor applied after each interval
    pub multiplier: f64,
    /// Jitter, as a fraction of the interval
    pub randomization_factor: f64,
    start_time: Instant,
}

impl ExponentialBackoff {
    /// Create a backoff starting now.
    #[must_use]
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_elapsed_time,
            multiplier,
            randomization_factor,
            start_time: Instant::now(),
        }
    }

    /// Time since the backoff was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Next interval to wait, or `None` once `max_elapsed_time` has passed.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_elapsed) = self.max_elapsed_time {
            if self.elapsed() >= max_elapsed {
                return None;
            }
        }

        let interval = self.current_interval;
        let grown = Duration::from_secs_f64(interval.as_secs_f64() * self.multiplier);
        self.current_interval = grown.min(self.max_interval);

        Some(self.jitter(interval))
    }

    fn jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let jittered = rand::rng().random_range((secs - delta)..=(secs + delta));

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Backoff for Kubernetes API calls.
///
/// 100ms initial interval, doubling up to 30s, giving up after 5 minutes.
#[must_use]
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        Some(Duration::from_secs(MAX_ELAPSED_TIME_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Backoff for DNS provider API calls.
///
/// 50ms initial interval, doubling up to 10s, giving up after 2 minutes.
/// Provider APIs rate limit aggressively, so retries start fast and stay short.
#[must_use]
pub fn http_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(HTTP_INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(HTTP_MAX_INTERVAL_SECS),
        Some(Duration::from_secs(HTTP_MAX_ELAPSED_TIME_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Run `operation` until it succeeds, fails permanently, or the backoff runs out.
///
/// `is_retryable` decides whether an error is transient. On a permanent error, or when
/// the backoff is exhausted, the last error is returned unchanged so callers keep
/// their own error type.
///
/// # Errors
///
/// Returns the last error produced by `operation`.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    mut backoff: ExponentialBackoff,
    operation_name: &str,
    is_retryable: R,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let e = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?backoff.elapsed(),
                        "Call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !is_retryable(&e) {
            error!(
                operation = operation_name,
                error = %e,
                "Non-retryable error, failing immediately"
            );
            return Err(e);
        }

        let Some(duration) = backoff.next_backoff() else {
            error!(
                operation = operation_name,
                attempt = attempt,
                elapsed = ?backoff.elapsed(),
                error = %e,
                "Backoff exhausted, giving up"
            );
            return Err(e);
        };

        warn!(
            operation = operation_name,
            attempt = attempt,
            retry_after = ?duration,
            error = %e,
            "Retryable error, will retry"
        );
        tokio::time::sleep(duration).await;
    }
}

/// Retry a Kubernetes API call with [`default_backoff`].
///
/// # Errors
///
/// Returns the last Kubernetes error, with `operation_name` as context, once the
/// error is permanent or the backoff is exhausted.
pub async fn retry_api_call<T, F, Fut>(operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    retry_with_backoff(default_backoff(), operation_name, is_retryable_error, operation)
        .await
        .map_err(|e| anyhow::Error::new(e).context(format!("Kubernetes API call failed: {operation_name}")))
}

/// Whether a Kubernetes error is transient.
///
/// HTTP 429, 5xx and service (connection) errors are retried. Every other error,
/// including 4xx client errors, is permanent.
pub(crate) fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => api_err.code == 429 || (500..600).contains(&api_err.code),
        kube::Error::Service(_) => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
