// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Retry policy for individual service calls.
//!
//! A [`RetryPolicy`] decides whether a failed call is worth repeating and
//! how long to wait before doing so. It is parameterized by the service name
//! (some services report extra transient conflict codes) and by whether a
//! 404 should be treated as eventual consistency or as a final answer.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};

/// Default number of attempts per call (first attempt included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Default total time budget for retrying one call.
pub const DEFAULT_RETRY_DURATION: Duration = Duration::from_secs(600);

/// 409 codes every service reports while a conflicting operation is still running.
const COMMON_CONFLICT_CODES: &[&str] = &["IncorrectState"];

/// Additional transient 409 codes, per service.
fn service_conflict_codes(service: &str) -> &'static [&'static str] {
    match service {
        "object_storage" => &["ConcurrentObjectUpdate"],
        "kms" => &["Conflict"],
        "streaming" => &["ResourceInUse"],
        _ => &[],
    }
}

/// Retry decision and backoff for a single service call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    service: String,
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    max_elapsed: Duration,
    retry_not_found: bool,
    jitter: bool,
}

impl RetryPolicy {
    /// Default policy for a service.
    ///
    /// When `disable_not_found_retries` is false, 404 responses are retried
    /// to ride out eventual consistency right after a create.
    pub fn for_service(service: impl Into<String>, disable_not_found_retries: bool) -> Self {
        Self {
            service: service.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_elapsed: DEFAULT_RETRY_DURATION,
            retry_not_found: !disable_not_found_retries,
            jitter: true,
        }
    }

    /// Apply provider-level retry settings.
    pub fn configured(mut self, config: &ProviderConfig) -> Self {
        if let Some(duration) = config.retry_duration {
            self.max_elapsed = duration;
        }
        if config.disable_auto_retries {
            self.max_attempts = 1;
        }
        self
    }

    /// Service this policy belongs to.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Whether 404 responses are retried.
    pub fn retries_not_found(&self) -> bool {
        self.retry_not_found
    }

    /// Set the maximum number of attempts (first attempt included).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the delay before the first retry.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the cap on a single backoff delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the total time budget for one call.
    pub fn with_max_elapsed(mut self, elapsed: Duration) -> Self {
        self.max_elapsed = elapsed;
        self
    }

    /// Same policy with the total budget shrunk to at most `budget`.
    pub fn bounded_by(&self, budget: Duration) -> Self {
        let mut bounded = self.clone();
        bounded.max_elapsed = bounded.max_elapsed.min(budget);
        bounded
    }

    /// Enable or disable 404 retries.
    pub fn with_not_found_retries(mut self, retry: bool) -> Self {
        self.retry_not_found = retry;
        self
    }

    /// Enable or disable jitter on backoff delays.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Decide whether a call that failed with `error` should be attempted again.
    ///
    /// `attempts` is the number of attempts made so far (1 after the first
    /// failure) and `elapsed` the time since the first attempt started.
    pub fn should_retry(&self, error: &ProviderError, attempts: u32, elapsed: Duration) -> bool {
        if attempts >= self.max_attempts || elapsed >= self.max_elapsed {
            return false;
        }

        let ProviderError::Service(err) = error else {
            return false;
        };

        match err.status {
            429 | 500 | 502 | 503 | 504 => true,
            404 => self.retry_not_found,
            409 => {
                COMMON_CONFLICT_CODES.contains(&err.code.as_str())
                    || service_conflict_codes(&self.service).contains(&err.code.as_str())
            }
            _ => false,
        }
    }

    /// Calculate the delay before retry `attempt` (1-indexed).
    ///
    /// Exponential: base * 2^(attempt-1), capped at the maximum delay. With
    /// jitter enabled the delay is drawn from the upper half of that window.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let exp_ms = base_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
            .min(max_ms);

        let ms = if self.jitter && exp_ms > 1 {
            let half = exp_ms / 2;
            half + rand::thread_rng().gen_range(0..=exp_ms - half)
        } else {
            exp_ms
        };
        Duration::from_millis(ms)
    }

    /// Run `call` under this policy, sleeping between attempts.
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = tokio::time::Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(&err, attempts, started.elapsed()) => {
                    let delay = self
                        .delay_for_attempt(attempts)
                        .min(self.max_elapsed.saturating_sub(started.elapsed()));
                    warn!(
                        service = %self.service,
                        operation = operation,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying service call"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
