// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory OCI fake.
//!
//! [`FakeOci`] implements every service client trait of the provider over
//! one shared state. Asynchronous behaviour is modelled by observation
//! count rather than wall time: a work request or a transitioning stream
//! settles on its `settle_polls`-th observation (the first one at minimum).
//! Tests therefore run with paused tokio time and never really sleep.
//!
//! Like the real Logging service, a log group rejects updates and moves
//! with 409 `IncorrectState` until its running work request has finished.
//!
//! Faults are armed with the async setters (`throttle_next`,
//! `not_found_for_next_gets`, `fail_next_work_request`, `park_next_stream`,
//! `set_never_converge`) and consumed by the calls that follow.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ocitf_core::{
    ActionType, Page, ProviderError, Result, ServiceError, WorkRequest, WorkRequestClient,
    WorkRequestError, WorkRequestHandle, WorkRequestResource, WorkRequestStatus,
};
use ocitf_provider::ServiceClients;
use ocitf_provider::logging::{
    CreateLogGroupDetails, ListLogGroupsRequest, LOG_GROUP_ENTITY_TYPE, LogGroup,
    LogGroupLifecycleState, LoggingClient, UpdateLogGroupDetails,
};
use ocitf_provider::opsi::OpsiClient;
use ocitf_provider::streaming::{
    CreateStreamDetails, ListStreamsRequest, Stream, StreamAdminClient, StreamLifecycleState,
    UpdateStreamDetails,
};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: usize = 50;
const DEFAULT_RETENTION_HOURS: i32 = 24;

fn ocid(kind: &str) -> String {
    format!("ocid1.{}.oc1..{}", kind, Uuid::new_v4().simple())
}

fn not_found(kind: &str, id: &str) -> ProviderError {
    ServiceError::not_found(format!("{} {} not found", kind, id)).into()
}

/// Log groups accept changes only while ACTIVE.
fn ensure_active(lg: &LogGroup) -> Result<()> {
    if lg.lifecycle_state != LogGroupLifecycleState::Active {
        return Err(ServiceError::new(
            409,
            "IncorrectState",
            format!("log group {} is {}", lg.id, lg.lifecycle_state),
        )
        .into());
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    Create,
    Update,
    Delete,
}

impl Effect {
    fn action(self) -> ActionType {
        match self {
            Effect::Create => ActionType::Created,
            Effect::Update => ActionType::Updated,
            Effect::Delete => ActionType::Deleted,
        }
    }
}

#[derive(Debug)]
struct FakeWorkRequest {
    request: WorkRequest,
    target: String,
    effect: Effect,
    polls_left: u32,
    errors: Vec<WorkRequestError>,
}

#[derive(Debug)]
struct FakeStream {
    stream: Stream,
    /// State the stream moves to once `polls_left` runs out.
    settles_to: Option<StreamLifecycleState>,
    polls_left: u32,
}

#[derive(Debug, Default)]
struct FakeState {
    log_groups: BTreeMap<String, LogGroup>,
    streams: BTreeMap<String, FakeStream>,
    /// Stream pool → compartment.
    stream_pools: BTreeMap<String, String>,
    work_requests: BTreeMap<String, FakeWorkRequest>,
    calls: BTreeMap<String, u32>,
    throttle: u32,
    not_found_gets: u32,
    fail_next: Option<WorkRequestError>,
    park_next: Option<StreamLifecycleState>,
    never_converge: bool,
}

impl FakeState {
    /// Count the call and consume an armed throttle.
    fn enter(&mut self, operation: &str) -> Result<()> {
        *self.calls.entry(operation.to_string()).or_default() += 1;
        if self.throttle > 0 {
            self.throttle -= 1;
            debug!(operation, "Fake throttling call");
            return Err(ServiceError::throttled().into());
        }
        Ok(())
    }

    fn stale_read(&mut self) -> bool {
        if self.not_found_gets > 0 {
            self.not_found_gets -= 1;
            return true;
        }
        false
    }

    fn submit(
        &mut self,
        operation_type: &str,
        target: &str,
        effect: Effect,
        settle_polls: u32,
    ) -> WorkRequestHandle {
        let id = ocid("loggingworkrequest");
        let errors = self
            .fail_next
            .take()
            .map(|err| vec![err])
            .unwrap_or_default();
        let request = WorkRequest {
            id: id.clone(),
            operation_type: operation_type.to_string(),
            status: WorkRequestStatus::Accepted,
            percent_complete: 0.0,
            resources: vec![WorkRequestResource {
                entity_type: LOG_GROUP_ENTITY_TYPE.to_string(),
                action_type: ActionType::InProgress,
                identifier: target.to_string(),
                entity_uri: Some(format!("/logGroups/{}", target)),
            }],
            time_accepted: Utc::now(),
            time_finished: None,
        };
        self.work_requests.insert(
            id.clone(),
            FakeWorkRequest {
                request,
                target: target.to_string(),
                effect,
                polls_left: settle_polls,
                errors,
            },
        );
        WorkRequestHandle::new(id)
    }

    /// Apply the outcome of a finished work request to its log group.
    fn finish(&mut self, target: &str, effect: Effect, failed: bool) {
        match (effect, failed) {
            (Effect::Delete, false) => {
                self.log_groups.remove(target);
            }
            (Effect::Create, true) => {
                if let Some(lg) = self.log_groups.get_mut(target) {
                    lg.lifecycle_state = LogGroupLifecycleState::Failed;
                }
            }
            _ => {
                if let Some(lg) = self.log_groups.get_mut(target) {
                    lg.lifecycle_state = LogGroupLifecycleState::Active;
                }
            }
        }
    }

    /// Advance a transitioning stream by one observation.
    fn observe_stream(&mut self, id: &str) -> Option<Stream> {
        let never_converge = self.never_converge;
        let fake = self.streams.get_mut(id)?;
        if !never_converge && fake.settles_to.is_some() {
            fake.polls_left = fake.polls_left.saturating_sub(1);
            if fake.polls_left == 0
                && let Some(state) = fake.settles_to.take()
            {
                fake.stream.lifecycle_state = state;
                if state == StreamLifecycleState::Failed {
                    fake.stream.lifecycle_state_details =
                        Some("Partition provisioning failed".to_string());
                }
            }
        }
        Some(fake.stream.clone())
    }

    fn default_pool(&mut self, compartment_id: &str) -> String {
        if let Some((pool, _)) = self
            .stream_pools
            .iter()
            .find(|(pool, compartment)| {
                compartment.as_str() == compartment_id && pool.contains(".default")
            })
        {
            return pool.clone();
        }
        let pool = format!("ocid1.streampool.oc1..default{}", Uuid::new_v4().simple());
        self.stream_pools
            .insert(pool.clone(), compartment_id.to_string());
        pool
    }
}

fn page_of<T: Clone>(items: Vec<T>, page: Option<&str>, limit: usize) -> Result<Page<T>> {
    let start = match page {
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| ServiceError::new(400, "InvalidParameter", "invalid page token"))?,
        None => 0,
    };
    let end = (start + limit).min(items.len());
    let next_page = (end < items.len()).then(|| end.to_string());
    Ok(Page {
        items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
        next_page,
    })
}

/// In-memory stand-in for the Logging, Streaming and Operations Insights
/// services.
pub struct FakeOci {
    state: Mutex<FakeState>,
    settle_polls: u32,
    page_size: usize,
}

impl Default for FakeOci {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeOci {
    /// Fake whose work requests and streams settle on the second poll.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            settle_polls: 2,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_settle_polls(mut self, polls: u32) -> Self {
        self.settle_polls = polls;
        self
    }

    /// Items per list page.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Wrap in an `Arc` and hand out every client.
    pub fn into_clients(self) -> (Arc<Self>, ServiceClients) {
        let fake = Arc::new(self);
        let clients = fake.clients();
        (fake, clients)
    }

    pub fn clients(self: &Arc<Self>) -> ServiceClients {
        ServiceClients {
            logging: self.clone(),
            logging_work_requests: self.clone(),
            streaming: self.clone(),
            opsi: self.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    /// The next `calls` calls (of any operation) fail with 429.
    pub async fn throttle_next(&self, calls: u32) {
        self.state.lock().await.throttle = calls;
    }

    /// The next `gets` reads of a log group or stream return 404 even if
    /// the resource exists.
    pub async fn not_found_for_next_gets(&self, gets: u32) {
        self.state.lock().await.not_found_gets = gets;
    }

    /// The next submitted work request ends FAILED with this error.
    pub async fn fail_next_work_request(&self, code: &str, message: &str) {
        self.state.lock().await.fail_next = Some(WorkRequestError {
            code: code.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// The next created stream settles in `state` instead of ACTIVE.
    pub async fn park_next_stream(&self, state: StreamLifecycleState) {
        self.state.lock().await.park_next = Some(state);
    }

    /// Work requests stay IN_PROGRESS and streams stay in their transient
    /// state while set.
    pub async fn set_never_converge(&self, never: bool) {
        self.state.lock().await.never_converge = never;
    }

    // ------------------------------------------------------------------
    // Inspection and seeding
    // ------------------------------------------------------------------

    /// How often `operation` was called, throttled calls included.
    pub async fn calls(&self, operation: &str) -> u32 {
        self.state
            .lock()
            .await
            .calls
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub async fn log_group(&self, id: &str) -> Option<LogGroup> {
        self.state.lock().await.log_groups.get(id).cloned()
    }

    pub async fn stream(&self, id: &str) -> Option<Stream> {
        self.state
            .lock()
            .await
            .streams
            .get(id)
            .map(|s| s.stream.clone())
    }

    /// Register a stream pool in a compartment.
    pub async fn add_stream_pool(&self, compartment_id: &str) -> String {
        let pool = ocid("streampool");
        self.state
            .lock()
            .await
            .stream_pools
            .insert(pool.clone(), compartment_id.to_string());
        pool
    }

    /// Insert an ACTIVE log group directly, bypassing work requests.
    pub async fn seed_log_group(&self, compartment_id: &str, display_name: &str) -> String {
        let id = ocid("loggroup");
        let now = Utc::now();
        self.state.lock().await.log_groups.insert(
            id.clone(),
            LogGroup {
                id: id.clone(),
                compartment_id: compartment_id.to_string(),
                display_name: display_name.to_string(),
                description: None,
                defined_tags: BTreeMap::new(),
                freeform_tags: BTreeMap::new(),
                lifecycle_state: LogGroupLifecycleState::Active,
                time_created: now,
                time_last_modified: now,
            },
        );
        id
    }

    /// Insert an ACTIVE stream directly in the compartment's default pool.
    pub async fn seed_stream(&self, compartment_id: &str, name: &str) -> String {
        let id = ocid("stream");
        let mut state = self.state.lock().await;
        let pool = state.default_pool(compartment_id);
        state.streams.insert(
            id.clone(),
            FakeStream {
                stream: Stream {
                    id: id.clone(),
                    name: name.to_string(),
                    compartment_id: compartment_id.to_string(),
                    stream_pool_id: pool,
                    partitions: 1,
                    retention_in_hours: DEFAULT_RETENTION_HOURS,
                    messages_endpoint: "https://cell-1.streaming.fake.oci.example".to_string(),
                    lifecycle_state: StreamLifecycleState::Active,
                    lifecycle_state_details: None,
                    defined_tags: BTreeMap::new(),
                    freeform_tags: BTreeMap::new(),
                    time_created: Utc::now(),
                },
                settles_to: None,
                polls_left: 0,
            },
        );
        id
    }
}

#[async_trait]
impl WorkRequestClient for FakeOci {
    async fn get_work_request(&self, id: &str) -> Result<WorkRequest> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.enter("get_work_request")?;

        let (target, effect, failed) = {
            let wr = state
                .work_requests
                .get_mut(id)
                .ok_or_else(|| not_found("work request", id))?;
            if wr.request.status.is_terminal() || state.never_converge {
                if !wr.request.status.is_terminal() {
                    wr.request.status = WorkRequestStatus::InProgress;
                }
                return Ok(wr.request.clone());
            }
            wr.polls_left = wr.polls_left.saturating_sub(1);
            if wr.polls_left > 0 {
                wr.request.status = WorkRequestStatus::InProgress;
                wr.request.percent_complete = 50.0;
                return Ok(wr.request.clone());
            }
            (wr.target.clone(), wr.effect, !wr.errors.is_empty())
        };

        state.finish(&target, effect, failed);

        let wr = state
            .work_requests
            .get_mut(id)
            .ok_or_else(|| not_found("work request", id))?;
        wr.request.status = if failed {
            WorkRequestStatus::Failed
        } else {
            WorkRequestStatus::Succeeded
        };
        wr.request.percent_complete = 100.0;
        wr.request.time_finished = Some(Utc::now());
        if !failed {
            for resource in &mut wr.request.resources {
                resource.action_type = effect.action();
            }
        }
        debug!(id, status = %wr.request.status, "Fake work request finished");
        Ok(wr.request.clone())
    }

    async fn list_work_request_errors(&self, id: &str) -> Result<Vec<WorkRequestError>> {
        let mut state = self.state.lock().await;
        state.enter("list_work_request_errors")?;
        state
            .work_requests
            .get(id)
            .map(|wr| wr.errors.clone())
            .ok_or_else(|| not_found("work request", id))
    }
}

#[async_trait]
impl LoggingClient for FakeOci {
    async fn create_log_group(&self, details: CreateLogGroupDetails) -> Result<WorkRequestHandle> {
        let mut state = self.state.lock().await;
        state.enter("create_log_group")?;

        let id = ocid("loggroup");
        let now = Utc::now();
        state.log_groups.insert(
            id.clone(),
            LogGroup {
                id: id.clone(),
                compartment_id: details.compartment_id,
                display_name: details.display_name,
                description: details.description.filter(|d| !d.is_empty()),
                defined_tags: details.defined_tags.unwrap_or_default(),
                freeform_tags: details.freeform_tags.unwrap_or_default(),
                lifecycle_state: LogGroupLifecycleState::Creating,
                time_created: now,
                time_last_modified: now,
            },
        );
        Ok(state.submit("CREATE_LOG_GROUP", &id, Effect::Create, self.settle_polls))
    }

    async fn get_log_group(&self, id: &str) -> Result<LogGroup> {
        let mut state = self.state.lock().await;
        state.enter("get_log_group")?;
        if state.stale_read() {
            return Err(not_found("log group", id));
        }
        state
            .log_groups
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("log group", id))
    }

    async fn update_log_group(
        &self,
        id: &str,
        details: UpdateLogGroupDetails,
    ) -> Result<WorkRequestHandle> {
        let mut state = self.state.lock().await;
        state.enter("update_log_group")?;

        let lg = state
            .log_groups
            .get_mut(id)
            .ok_or_else(|| not_found("log group", id))?;
        ensure_active(lg)?;
        if let Some(display_name) = details.display_name {
            lg.display_name = display_name;
        }
        if let Some(description) = details.description {
            lg.description = (!description.is_empty()).then_some(description);
        }
        if let Some(defined_tags) = details.defined_tags {
            lg.defined_tags = defined_tags;
        }
        if let Some(freeform_tags) = details.freeform_tags {
            lg.freeform_tags = freeform_tags;
        }
        lg.lifecycle_state = LogGroupLifecycleState::Updating;
        lg.time_last_modified = Utc::now();

        Ok(state.submit("UPDATE_LOG_GROUP", id, Effect::Update, self.settle_polls))
    }

    async fn change_log_group_compartment(
        &self,
        id: &str,
        compartment_id: &str,
    ) -> Result<WorkRequestHandle> {
        let mut state = self.state.lock().await;
        state.enter("change_log_group_compartment")?;

        let lg = state
            .log_groups
            .get_mut(id)
            .ok_or_else(|| not_found("log group", id))?;
        ensure_active(lg)?;
        lg.compartment_id = compartment_id.to_string();
        lg.lifecycle_state = LogGroupLifecycleState::Updating;

        Ok(state.submit("MOVE_LOG_GROUP", id, Effect::Update, self.settle_polls))
    }

    async fn delete_log_group(&self, id: &str) -> Result<WorkRequestHandle> {
        let mut state = self.state.lock().await;
        state.enter("delete_log_group")?;

        let lg = state
            .log_groups
            .get_mut(id)
            .ok_or_else(|| not_found("log group", id))?;
        lg.lifecycle_state = LogGroupLifecycleState::Deleting;

        Ok(state.submit("DELETE_LOG_GROUP", id, Effect::Delete, self.settle_polls))
    }

    async fn list_log_groups(&self, request: ListLogGroupsRequest) -> Result<Page<LogGroup>> {
        let mut state = self.state.lock().await;
        state.enter("list_log_groups")?;

        let items: Vec<LogGroup> = state
            .log_groups
            .values()
            .filter(|lg| lg.compartment_id == request.compartment_id)
            .filter(|lg| {
                request
                    .display_name
                    .as_ref()
                    .is_none_or(|name| &lg.display_name == name)
            })
            .cloned()
            .collect();
        let limit = request
            .limit
            .map_or(self.page_size, |l| l as usize)
            .min(self.page_size);
        page_of(items, request.page.as_deref(), limit)
    }
}

#[async_trait]
impl StreamAdminClient for FakeOci {
    async fn create_stream(&self, details: CreateStreamDetails) -> Result<Stream> {
        let mut state = self.state.lock().await;
        state.enter("create_stream")?;

        let (compartment_id, stream_pool_id) = match (&details.stream_pool_id, &details.compartment_id)
        {
            (Some(pool), _) => {
                let compartment = state
                    .stream_pools
                    .get(pool)
                    .cloned()
                    .ok_or_else(|| not_found("stream pool", pool))?;
                (compartment, pool.clone())
            }
            (None, Some(compartment)) => {
                let pool = state.default_pool(compartment);
                (compartment.clone(), pool)
            }
            (None, None) => {
                return Err(ServiceError::new(
                    400,
                    "InvalidParameter",
                    "compartmentId or streamPoolId is required",
                )
                .into());
            }
        };

        let id = ocid("stream");
        let settles_to = state.park_next.take().unwrap_or(StreamLifecycleState::Active);
        let stream = Stream {
            id: id.clone(),
            name: details.name,
            compartment_id,
            stream_pool_id,
            partitions: details.partitions,
            retention_in_hours: details.retention_in_hours.unwrap_or(DEFAULT_RETENTION_HOURS),
            messages_endpoint: "https://cell-1.streaming.fake.oci.example".to_string(),
            lifecycle_state: StreamLifecycleState::Creating,
            lifecycle_state_details: None,
            defined_tags: details.defined_tags.unwrap_or_default(),
            freeform_tags: details.freeform_tags.unwrap_or_default(),
            time_created: Utc::now(),
        };
        state.streams.insert(
            id,
            FakeStream {
                stream: stream.clone(),
                settles_to: Some(settles_to),
                polls_left: self.settle_polls,
            },
        );
        Ok(stream)
    }

    async fn get_stream(&self, id: &str) -> Result<Stream> {
        let mut state = self.state.lock().await;
        state.enter("get_stream")?;
        if state.stale_read() {
            return Err(not_found("stream", id));
        }
        state
            .observe_stream(id)
            .ok_or_else(|| not_found("stream", id))
    }

    async fn update_stream(&self, id: &str, details: UpdateStreamDetails) -> Result<Stream> {
        let mut state = self.state.lock().await;
        state.enter("update_stream")?;

        let fake = state
            .streams
            .get_mut(id)
            .filter(|s| s.stream.lifecycle_state != StreamLifecycleState::Deleted)
            .ok_or_else(|| not_found("stream", id))?;
        if let Some(defined_tags) = details.defined_tags {
            fake.stream.defined_tags = defined_tags;
        }
        if let Some(freeform_tags) = details.freeform_tags {
            fake.stream.freeform_tags = freeform_tags;
        }
        fake.stream.lifecycle_state = StreamLifecycleState::Updating;
        fake.settles_to = Some(StreamLifecycleState::Active);
        fake.polls_left = self.settle_polls;
        Ok(fake.stream.clone())
    }

    async fn change_stream_compartment(&self, id: &str, compartment_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.enter("change_stream_compartment")?;

        let fake = state
            .streams
            .get_mut(id)
            .filter(|s| s.stream.lifecycle_state != StreamLifecycleState::Deleted)
            .ok_or_else(|| not_found("stream", id))?;
        fake.stream.compartment_id = compartment_id.to_string();
        Ok(())
    }

    async fn delete_stream(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.enter("delete_stream")?;

        let fake = state
            .streams
            .get_mut(id)
            .filter(|s| s.stream.lifecycle_state != StreamLifecycleState::Deleted)
            .ok_or_else(|| not_found("stream", id))?;
        fake.stream.lifecycle_state = StreamLifecycleState::Deleting;
        fake.settles_to = Some(StreamLifecycleState::Deleted);
        fake.polls_left = self.settle_polls;
        Ok(())
    }

    async fn list_streams(&self, request: ListStreamsRequest) -> Result<Page<Stream>> {
        let mut state = self.state.lock().await;
        state.enter("list_streams")?;

        let items: Vec<Stream> = state
            .streams
            .values()
            .map(|s| &s.stream)
            .filter(|s| {
                request
                    .compartment_id
                    .as_ref()
                    .is_none_or(|c| &s.compartment_id == c)
            })
            .filter(|s| {
                request
                    .stream_pool_id
                    .as_ref()
                    .is_none_or(|p| &s.stream_pool_id == p)
            })
            .filter(|s| request.id.as_ref().is_none_or(|id| &s.id == id))
            .filter(|s| request.name.as_ref().is_none_or(|n| &s.name == n))
            .filter(|s| {
                request
                    .lifecycle_state
                    .is_none_or(|wanted| s.lifecycle_state == wanted)
            })
            .cloned()
            .collect();
        let limit = request
            .limit
            .map_or(self.page_size, |l| l as usize)
            .min(self.page_size);
        page_of(items, request.page.as_deref(), limit)
    }
}

#[async_trait]
impl OpsiClient for FakeOci {
    async fn download_operations_insights_warehouse_wallet(
        &self,
        warehouse_id: &str,
        _password: &str,
    ) -> Result<Vec<u8>> {
        let mut state = self.state.lock().await;
        state.enter("download_operations_insights_warehouse_wallet")?;
        Ok(format!("PK-wallet-{}", warehouse_id).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_of_splits_items() {
        let first = page_of(vec![1, 2, 3], None, 2).unwrap();
        assert_eq!(first.items, vec![1, 2]);
        assert_eq!(first.next_page.as_deref(), Some("2"));

        let last = page_of(vec![1, 2, 3], Some("2"), 2).unwrap();
        assert_eq!(last.items, vec![3]);
        assert!(last.next_page.is_none());
    }

    #[tokio::test]
    async fn test_work_request_settles_on_configured_poll() {
        let fake = FakeOci::new().with_settle_polls(3);
        let handle = fake
            .create_log_group(CreateLogGroupDetails {
                compartment_id: "c".to_string(),
                display_name: "lg".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        for _ in 0..2 {
            let wr = fake.get_work_request(handle.as_str()).await.unwrap();
            assert_eq!(wr.status, WorkRequestStatus::InProgress);
        }
        let wr = fake.get_work_request(handle.as_str()).await.unwrap();
        assert_eq!(wr.status, WorkRequestStatus::Succeeded);

        let id = wr
            .affected(LOG_GROUP_ENTITY_TYPE, ActionType::Created)
            .unwrap()
            .to_string();
        assert_eq!(
            fake.log_group(&id).await.unwrap().lifecycle_state,
            LogGroupLifecycleState::Active
        );
    }

    #[tokio::test]
    async fn test_throttle_counts_calls() {
        let fake = FakeOci::new();
        fake.throttle_next(1).await;
        let err = fake.get_stream("missing").await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        let err = fake.get_stream("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(fake.calls("get_stream").await, 2);
    }

    #[tokio::test]
    async fn test_stream_in_unknown_pool_is_not_found() {
        let fake = FakeOci::new();
        let err = fake
            .create_stream(CreateStreamDetails {
                name: "s".to_string(),
                partitions: 1,
                stream_pool_id: Some("ocid1.streampool.oc1..nope".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
