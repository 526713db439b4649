// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Generic poller and the lifecycle poller built on it.
//!
//! [`Poller`] runs a check until it reports readiness or failure, sleeping
//! with exponential backoff in between. The last sleep is clipped to the
//! remaining budget, so a poll always terminates within its timeout plus
//! the duration of one check.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ProviderError, Result};
use crate::lifecycle::{LifecycleStateSet, StateClass};

/// Outcome of one check.
#[derive(Debug)]
pub enum Poll<T> {
    /// The condition holds; stop polling with this value.
    Ready(T),
    /// Not there yet; the string describes what was observed.
    Pending(String),
    /// Stop polling with this error.
    Failed(ProviderError),
}

/// Backoff and timeout settings for a poll.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay after the first pending check.
    pub initial_interval: Duration,
    /// Cap on the delay between checks.
    pub max_interval: Duration,
    /// Factor applied to the delay after each pending check.
    pub multiplier: u32,
    /// Total time budget.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            multiplier: 2,
            timeout: Duration::from_secs(20 * 60),
        }
    }
}

impl PollConfig {
    /// Same backoff, different timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Runs a check until it is ready, fails, or the timeout elapses.
#[derive(Debug, Clone, Default)]
pub struct Poller {
    config: PollConfig,
}

impl Poller {
    /// Create a poller with the given settings.
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    /// Poll `check` until it returns [`Poll::Ready`] or [`Poll::Failed`].
    ///
    /// Returns [`ProviderError::Timeout`] carrying the last observed value
    /// when the budget runs out.
    pub async fn poll<T, F, Fut>(&self, description: &str, mut check: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Poll<T>>,
    {
        let started = tokio::time::Instant::now();
        let deadline = started + self.config.timeout;
        let mut interval = self.config.initial_interval;
        let mut checks = 0u32;

        loop {
            checks += 1;
            let last_observed = match check().await {
                Poll::Ready(value) => {
                    debug!(
                        operation = description,
                        checks = checks,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Poll converged"
                    );
                    return Ok(value);
                }
                Poll::Failed(err) => return Err(err),
                Poll::Pending(observed) => observed,
            };

            let now = tokio::time::Instant::now();
            if now >= deadline {
                warn!(
                    operation = description,
                    last_observed = %last_observed,
                    "Poll timed out"
                );
                return Err(ProviderError::Timeout {
                    operation: description.to_string(),
                    waited: self.config.timeout,
                    last_observed,
                });
            }

            let sleep_for = interval.min(deadline - now);
            debug!(
                operation = description,
                observed = %last_observed,
                sleep_ms = sleep_for.as_millis() as u64,
                "Still pending"
            );
            tokio::time::sleep(sleep_for).await;

            interval = interval
                .saturating_mul(self.config.multiplier)
                .min(self.config.max_interval);
        }
    }
}

/// Polls a resource's lifecycle state against a [`LifecycleStateSet`].
#[derive(Debug, Clone, Default)]
pub struct LifecyclePoller {
    config: PollConfig,
}

impl LifecyclePoller {
    /// Create a lifecycle poller with the given backoff (the timeout is per call).
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    /// Wait until `get` reports a target state.
    ///
    /// Returns `Ok(None)` when the resource vanished and the set treats
    /// not-found as target. A state outside both sets ends the wait with
    /// [`ProviderError::UnexpectedState`] carrying the state verbatim.
    pub async fn wait_for<R, G, Fut, S>(
        &self,
        resource: &str,
        states: &LifecycleStateSet,
        timeout: Duration,
        mut get: G,
        state_of: S,
    ) -> Result<Option<R>>
    where
        G: FnMut() -> Fut,
        Fut: Future<Output = Result<R>>,
        S: Fn(&R) -> String,
        R: Debug,
    {
        let poller = Poller::new(self.config.clone().with_timeout(timeout));
        let description = format!("{} to reach {:?}", resource, states.target());
        let state_of = &state_of;

        poller
            .poll(&description, move || {
                let fut = get();
                async move {
                    match fut.await {
                        Ok(remote) => {
                            let state = state_of(&remote);
                            match states.classify(&state) {
                                StateClass::Target => Poll::Ready(Some(remote)),
                                StateClass::Pending => Poll::Pending(state),
                                StateClass::Unexpected => {
                                    Poll::Failed(ProviderError::UnexpectedState {
                                        resource: resource.to_string(),
                                        state,
                                        pending: states.pending(),
                                        target: states.target(),
                                    })
                                }
                            }
                        }
                        Err(err) if err.is_not_found() && states.not_found_is_target() => {
                            Poll::Ready(None)
                        }
                        Err(err) => Poll::Failed(err),
                    }
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sequence(states: &'static [&'static str]) -> (Arc<AtomicU32>, impl FnMut() -> std::future::Ready<Result<String>>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let get = move || {
            let i = counter.fetch_add(1, Ordering::SeqCst) as usize;
            let state = states[i.min(states.len() - 1)];
            std::future::ready(if state == "404" {
                Err(ServiceError::not_found("gone").into())
            } else {
                Ok(state.to_string())
            })
        };
        (calls, get)
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_ready_immediately() {
        let poller = Poller::default();
        let value = poller
            .poll("ready", || async { Poll::Ready(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_with_last_observed() {
        let poller = Poller::new(PollConfig::default().with_timeout(Duration::from_secs(60)));
        let started = tokio::time::Instant::now();

        let err = poller
            .poll::<(), _, _>("never", || async { Poll::Pending("CREATING".to_string()) })
            .await
            .unwrap_err();

        match err {
            ProviderError::Timeout { last_observed, waited, .. } => {
                assert_eq!(last_observed, "CREATING");
                assert_eq!(waited, Duration::from_secs(60));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(started.elapsed() < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_reaches_target() {
        let poller = LifecyclePoller::default();
        let states = LifecycleStateSet::new(&["CREATING"], &["ACTIVE"]).unwrap();
        let (calls, get) = sequence(&["CREATING", "CREATING", "ACTIVE"]);

        let result = poller
            .wait_for("stream", &states, Duration::from_secs(300), get, |s: &String| s.clone())
            .await
            .unwrap();

        assert_eq!(result.as_deref(), Some("ACTIVE"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_unexpected_state_is_verbatim() {
        let poller = LifecyclePoller::default();
        let states = LifecycleStateSet::new(&["CREATING"], &["ACTIVE"]).unwrap();
        let (_, get) = sequence(&["CREATING", "FAILED"]);

        let err = poller
            .wait_for("stream", &states, Duration::from_secs(300), get, |s: &String| s.clone())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::UnexpectedState { ref state, .. } if state == "FAILED"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_not_found_as_target() {
        let poller = LifecyclePoller::default();
        let states = LifecycleStateSet::new(&["DELETING"], &["DELETED"])
            .unwrap()
            .with_not_found_as_target();
        let (_, get) = sequence(&["DELETING", "404"]);

        let result = poller
            .wait_for("stream", &states, Duration::from_secs(300), get, |s: &String| s.clone())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_not_found_propagates_otherwise() {
        let poller = LifecyclePoller::default();
        let states = LifecycleStateSet::new(&["CREATING"], &["ACTIVE"]).unwrap();
        let (_, get) = sequence(&["404"]);

        let err = poller
            .wait_for("stream", &states, Duration::from_secs(300), get, |s: &String| s.clone())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
