// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Work request types and the waiter that drives them to completion.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::time::Instant;
use tracing::{info, instrument};

use crate::error::{ProviderError, Result};
use crate::poller::{Poll, PollConfig, Poller};
use crate::retry::RetryPolicy;

/// Status of a work request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkRequestStatus {
    /// Queued.
    Accepted,
    /// Running.
    InProgress,
    /// Finished successfully.
    Succeeded,
    /// Finished unsuccessfully.
    Failed,
    /// Cancellation requested.
    Canceling,
    /// Cancelled before completion.
    Canceled,
}

impl WorkRequestStatus {
    /// Whether the work request has finished (successfully or not).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// How a work request affected one resource.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// The resource was created.
    Created,
    /// The resource was updated.
    Updated,
    /// The resource was deleted.
    Deleted,
    /// The work request is still acting on the resource.
    InProgress,
    /// The resource is related but not directly affected.
    Related,
}

/// A resource touched by a work request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRequestResource {
    /// Resource kind, e.g. `loggroup`.
    pub entity_type: String,
    /// What happened to it.
    pub action_type: ActionType,
    /// Resource OCID.
    pub identifier: String,
    /// Path to GET the resource.
    pub entity_uri: Option<String>,
}

/// Snapshot of a work request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRequest {
    /// Work request OCID.
    pub id: String,
    /// Operation name, e.g. `CREATE_LOG_GROUP`.
    pub operation_type: String,
    /// Current status.
    pub status: WorkRequestStatus,
    /// Progress, 0-100.
    pub percent_complete: f32,
    /// Resources affected.
    pub resources: Vec<WorkRequestResource>,
    /// When the service accepted the request.
    pub time_accepted: DateTime<Utc>,
    /// When the request reached a terminal status.
    pub time_finished: Option<DateTime<Utc>>,
}

impl WorkRequest {
    /// Identifier of the affected resource of `entity_type` with the given action.
    pub fn affected(&self, entity_type: &str, action: ActionType) -> Option<&str> {
        self.resources
            .iter()
            .find(|r| r.entity_type.eq_ignore_ascii_case(entity_type) && r.action_type == action)
            .map(|r| r.identifier.as_str())
    }

    /// Identifier of the first resource of `entity_type`, whatever its action.
    pub fn target(&self, entity_type: &str) -> Option<&str> {
        self.resources
            .iter()
            .find(|r| r.entity_type.eq_ignore_ascii_case(entity_type))
            .map(|r| r.identifier.as_str())
    }
}

/// One error reported for a failed work request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRequestError {
    /// Machine-readable error code.
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// When the error occurred.
    pub timestamp: DateTime<Utc>,
}

/// Opaque handle of an asynchronous operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkRequestHandle(pub String);

impl WorkRequestHandle {
    /// Wrap a work request id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The work request id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkRequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Work request endpoints of a service.
#[async_trait]
pub trait WorkRequestClient: Send + Sync {
    /// Fetch the current snapshot of a work request.
    async fn get_work_request(&self, id: &str) -> Result<WorkRequest>;

    /// List the errors reported for a work request.
    async fn list_work_request_errors(&self, id: &str) -> Result<Vec<WorkRequestError>>;
}

/// Polls a work request until it reaches a terminal status.
#[derive(Clone)]
pub struct WorkRequestWaiter {
    client: Arc<dyn WorkRequestClient>,
    retry: RetryPolicy,
    poll: PollConfig,
}

impl WorkRequestWaiter {
    /// Create a waiter over `client`; each poll call runs under `retry`.
    pub fn new(client: Arc<dyn WorkRequestClient>, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            poll: PollConfig::default(),
        }
    }

    /// Override the poll backoff.
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Wait for `handle` to finish.
    ///
    /// On success returns the identifier of the affected `entity_type`
    /// resource whose action matches `action`, if the service reported one.
    /// A failed or cancelled work request becomes
    /// [`ProviderError::WorkRequestFailed`] with the service's error messages.
    #[instrument(skip(self), fields(work_request_id = %handle))]
    pub async fn wait(
        &self,
        handle: &WorkRequestHandle,
        entity_type: &str,
        action: ActionType,
        timeout: Duration,
    ) -> Result<Option<String>> {
        let poller = Poller::new(self.poll.clone().with_timeout(timeout));
        let description = format!("work request {}", handle);
        let deadline = Instant::now() + timeout;
        let client = &self.client;
        let retry = &self.retry;
        let id = handle.as_str();

        let finished = poller
            .poll(&description, move || async move {
                // Retries of one poll never outlive the overall timeout.
                let fetched = retry
                    .bounded_by(deadline.saturating_duration_since(Instant::now()))
                    .execute("get_work_request", move || client.get_work_request(id))
                    .await;
                match fetched {
                    Ok(wr) if wr.status.is_terminal() => Poll::Ready(wr),
                    Ok(wr) => Poll::Pending(format!("{} ({}%)", wr.status, wr.percent_complete)),
                    Err(err) => Poll::Failed(err),
                }
            })
            .await?;

        match finished.status {
            WorkRequestStatus::Succeeded => {
                let id = finished.affected(entity_type, action).map(str::to_string);
                info!(
                    operation_type = %finished.operation_type,
                    resource_id = id.as_deref().unwrap_or("-"),
                    "Work request succeeded"
                );
                Ok(id)
            }
            status => {
                let errors = self
                    .retry
                    .execute("list_work_request_errors", || {
                        self.client.list_work_request_errors(handle.as_str())
                    })
                    .await?;
                Err(ProviderError::WorkRequestFailed {
                    work_request_id: handle.to_string(),
                    status: status.to_string(),
                    errors: errors
                        .into_iter()
                        .map(|e| format!("{}: {}", e.code, e.message))
                        .collect(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    struct ScriptedClient {
        statuses: Mutex<VecDeque<Result<WorkRequestStatus>>>,
        errors: Vec<WorkRequestError>,
    }

    impl ScriptedClient {
        fn new(statuses: Vec<Result<WorkRequestStatus>>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                errors: vec![WorkRequestError {
                    code: "LimitExceeded".to_string(),
                    message: "log group limit reached".to_string(),
                    timestamp: Utc::now(),
                }],
            }
        }
    }

    #[async_trait]
    impl WorkRequestClient for ScriptedClient {
        async fn get_work_request(&self, id: &str) -> Result<WorkRequest> {
            let mut statuses = self.statuses.lock().await;
            let status = if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                match statuses.front().unwrap() {
                    Ok(s) => Ok(*s),
                    Err(_) => Err(ServiceError::throttled().into()),
                }
            }?;
            Ok(WorkRequest {
                id: id.to_string(),
                operation_type: "CREATE_LOG_GROUP".to_string(),
                status,
                percent_complete: if status.is_terminal() { 100.0 } else { 50.0 },
                resources: vec![WorkRequestResource {
                    entity_type: "loggroup".to_string(),
                    action_type: ActionType::Created,
                    identifier: "ocid1.loggroup.oc1..abc".to_string(),
                    entity_uri: None,
                }],
                time_accepted: Utc::now(),
                time_finished: None,
            })
        }

        async fn list_work_request_errors(&self, _id: &str) -> Result<Vec<WorkRequestError>> {
            Ok(self.errors.clone())
        }
    }

    fn waiter(statuses: Vec<Result<WorkRequestStatus>>) -> WorkRequestWaiter {
        WorkRequestWaiter::new(
            Arc::new(ScriptedClient::new(statuses)),
            RetryPolicy::for_service("logging", false),
        )
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(WorkRequestStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(
            "SUCCEEDED".parse::<WorkRequestStatus>().unwrap(),
            WorkRequestStatus::Succeeded
        );
        assert!(!WorkRequestStatus::Canceling.is_terminal());
        assert!(WorkRequestStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_target_ignores_action() {
        let request = WorkRequest {
            id: "wr-1".to_string(),
            operation_type: "CREATE_LOG_GROUP".to_string(),
            status: WorkRequestStatus::InProgress,
            percent_complete: 10.0,
            resources: vec![WorkRequestResource {
                entity_type: "LogGroup".to_string(),
                action_type: ActionType::InProgress,
                identifier: "ocid1.loggroup.oc1..abc".to_string(),
                entity_uri: None,
            }],
            time_accepted: Utc::now(),
            time_finished: None,
        };

        assert_eq!(request.target("loggroup"), Some("ocid1.loggroup.oc1..abc"));
        assert_eq!(request.affected("loggroup", ActionType::Created), None);
        assert_eq!(request.target("stream"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_affected_identifier() {
        let waiter = waiter(vec![
            Ok(WorkRequestStatus::Accepted),
            Ok(WorkRequestStatus::InProgress),
            Ok(WorkRequestStatus::Succeeded),
        ]);

        let id = waiter
            .wait(
                &WorkRequestHandle::new("wr-1"),
                "loggroup",
                ActionType::Created,
                Duration::from_secs(300),
            )
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("ocid1.loggroup.oc1..abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_mismatched_action_returns_none() {
        let waiter = waiter(vec![Ok(WorkRequestStatus::Succeeded)]);
        let id = waiter
            .wait(
                &WorkRequestHandle::new("wr-1"),
                "loggroup",
                ActionType::Deleted,
                Duration::from_secs(300),
            )
            .await
            .unwrap();
        assert!(id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_failed_embeds_service_errors() {
        let waiter = waiter(vec![
            Ok(WorkRequestStatus::InProgress),
            Ok(WorkRequestStatus::Failed),
        ]);

        let err = waiter
            .wait(
                &WorkRequestHandle::new("wr-2"),
                "loggroup",
                ActionType::Created,
                Duration::from_secs(300),
            )
            .await
            .unwrap_err();

        match err {
            ProviderError::WorkRequestFailed { work_request_id, status, errors } => {
                assert_eq!(work_request_id, "wr-2");
                assert_eq!(status, "FAILED");
                assert_eq!(errors, vec!["LimitExceeded: log group limit reached".to_string()]);
            }
            other => panic!("expected work request failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_retries_throttled_polls() {
        let waiter = waiter(vec![
            Err(ServiceError::throttled().into()),
            Ok(WorkRequestStatus::Succeeded),
        ]);

        let id = waiter
            .wait(
                &WorkRequestHandle::new("wr-3"),
                "loggroup",
                ActionType::Created,
                Duration::from_secs(300),
            )
            .await
            .unwrap();
        assert!(id.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let waiter = waiter(vec![Ok(WorkRequestStatus::InProgress)]);
        let err = waiter
            .wait(
                &WorkRequestHandle::new("wr-4"),
                "loggroup",
                ActionType::Created,
                Duration::from_secs(30),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { ref last_observed, .. } if last_observed.starts_with("IN_PROGRESS")));
    }
}
