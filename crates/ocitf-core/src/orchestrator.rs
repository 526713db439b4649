// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource trait and the CRUD orchestrator that drives it.
//!
//! A [`Resource`] implementation describes one resource type: its schema,
//! how to map its typed model to requests and back, and the raw service
//! calls. [`ResourceOrchestrator`] sequences those pieces with retries,
//! work request waits and lifecycle polling so that every resource type
//! follows the same create/poll/retry/converge contract.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::lifecycle::{LifecycleStateSet, ResourceLifecycle, StateClass};
use crate::poller::{LifecyclePoller, PollConfig};
use crate::retry::RetryPolicy;
use crate::schema::{ChangeSet, Plan, ResourceSpec, Timeouts};
use crate::state::ResourceState;
use crate::work_request::{ActionType, WorkRequestClient, WorkRequestHandle, WorkRequestWaiter};

/// Retry budget for finding the resource behind an unfinished create.
const TARGET_LOOKUP_BUDGET: Duration = Duration::from_secs(30);

/// Typed state of one resource instance.
pub trait ResourceModel:
    Serialize + DeserializeOwned + Clone + Default + Debug + Send + Sync + 'static
{
    /// The service-assigned identifier.
    fn id(&self) -> Option<&str>;

    /// Assign or clear the identifier.
    fn set_id(&mut self, id: Option<String>);
}

/// Response of a mutating call.
#[derive(Debug)]
pub enum Submitted<T> {
    /// The call returned the resource directly; converge by lifecycle polling.
    Done(T),
    /// The service accepted the call as one or more work requests.
    Accepted {
        /// Work requests to wait for, in order.
        work_requests: Vec<WorkRequestHandle>,
        /// Resource snapshot returned alongside, if any.
        resource: Option<T>,
    },
}

impl<T> Submitted<T> {
    /// A single accepted work request without a resource snapshot.
    pub fn work_request(handle: WorkRequestHandle) -> Self {
        Submitted::Accepted {
            work_requests: vec![handle],
            resource: None,
        }
    }
}

/// Where a resource's work requests are tracked.
#[derive(Clone)]
pub struct WorkRequestBinding {
    /// Client for the service's work request endpoints.
    pub client: Arc<dyn WorkRequestClient>,
    /// Entity type the service reports for this resource, e.g. `loggroup`.
    pub entity_type: String,
}

/// Result of a read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<M> {
    /// The resource exists; state refreshed.
    Found(M),
    /// The resource no longer exists and should be dropped from state.
    Gone,
}

/// One resource type: schema, mapping and raw service calls.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Typed local state.
    type Model: ResourceModel;
    /// Service representation.
    type Remote: Debug + Send + Sync + 'static;
    /// Create payload.
    type CreateRequest: Clone + Send + Sync + 'static;
    /// Update payload.
    type UpdateRequest: Clone + Send + Sync + 'static;

    /// Schema of this type.
    fn spec(&self) -> &ResourceSpec;

    /// Lifecycle state sets; operations without a set do not poll.
    fn lifecycle(&self) -> &ResourceLifecycle;

    /// Work request tracking, for types whose mutations are asynchronous.
    fn work_requests(&self) -> Option<WorkRequestBinding> {
        None
    }

    /// Build the create payload.
    fn create_request(&self, model: &Self::Model) -> Result<Self::CreateRequest>;

    /// Build the update payload from the changed attributes only.
    fn update_request(
        &self,
        prior: &Self::Model,
        desired: &Self::Model,
        changes: &ChangeSet,
    ) -> Result<Self::UpdateRequest>;

    /// Write the service representation into the model.
    fn apply_remote(&self, model: &mut Self::Model, remote: &Self::Remote);

    /// Identifier of a remote object.
    fn remote_id(&self, remote: &Self::Remote) -> String;

    /// Lifecycle state of a remote object, as reported by the service.
    fn lifecycle_state(&self, remote: &Self::Remote) -> String;

    /// Issue the create call.
    async fn create(&self, request: Self::CreateRequest) -> Result<Submitted<Self::Remote>>;

    /// Fetch the resource.
    async fn get(&self, id: &str) -> Result<Self::Remote>;

    /// Split an update into steps that each settle before the next one is
    /// issued, e.g. a compartment move ahead of an attribute update. Each
    /// step is retried and converged on its own.
    fn update_steps(&self, request: Self::UpdateRequest) -> Vec<Self::UpdateRequest> {
        vec![request]
    }

    /// Issue the call(s) of one update step.
    async fn update(
        &self,
        id: &str,
        request: Self::UpdateRequest,
    ) -> Result<Submitted<Self::Remote>>;

    /// Issue the delete call.
    async fn delete(&self, id: &str) -> Result<Option<WorkRequestHandle>>;
}

/// Drives a [`Resource`] through create, read, update and delete.
pub struct ResourceOrchestrator<R: Resource> {
    resource: Arc<R>,
    retry: RetryPolicy,
    poll: PollConfig,
    timeouts: Timeouts,
}

impl<R: Resource> Clone for ResourceOrchestrator<R> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            retry: self.retry.clone(),
            poll: self.poll.clone(),
            timeouts: self.timeouts,
        }
    }
}

impl<R: Resource> ResourceOrchestrator<R> {
    /// Create an orchestrator with the resource's default timeouts and the
    /// retry profile of its service.
    pub fn new(resource: R, config: &ProviderConfig) -> Self {
        let spec = resource.spec();
        let retry = RetryPolicy::for_service(spec.service.clone(), false).configured(config);
        let timeouts = spec.timeouts;
        Self {
            resource: Arc::new(resource),
            retry,
            poll: PollConfig::default(),
            timeouts,
        }
    }

    /// Override the per-operation timeouts.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Override the poll backoff.
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Treat not-found on read as final instead of retrying it.
    pub fn with_disable_not_found_retries(mut self, disable: bool) -> Self {
        self.retry = self.retry.with_not_found_retries(!disable);
        self
    }

    /// The wrapped resource.
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Schema of the wrapped resource.
    pub fn spec(&self) -> &ResourceSpec {
        self.resource.spec()
    }

    /// Effective timeouts.
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    fn type_name(&self) -> &str {
        &self.resource.spec().type_name
    }

    /// Create the resource and wait for it to converge.
    ///
    /// The returned model carries the service-assigned id and every computed
    /// attribute. Once the service has accepted the create, a failure to
    /// converge is reported as [`ProviderError::CreateIncomplete`] carrying
    /// the new id whenever it is known.
    #[instrument(skip(self, model), fields(resource_type = %self.type_name()))]
    pub async fn create(&self, model: &R::Model) -> Result<R::Model> {
        if model.id().is_some() {
            return Err(ProviderError::validation(
                "id",
                "resource already has an id; read or import it instead",
            ));
        }
        self.resource
            .spec()
            .validate_required(&ResourceState::from_model(model)?)?;

        let deadline = Instant::now() + self.timeouts.create;
        let request = self.resource.create_request(model)?;
        let resource = &self.resource;

        let submitted = self
            .retry
            .execute("create", || resource.create(request.clone()))
            .await?;

        let early_id = self.submitted_id(&submitted);
        let first_work_request = match &submitted {
            Submitted::Accepted { work_requests, .. } => work_requests.first().cloned(),
            Submitted::Done(_) => None,
        };

        let (id, latest) = match self
            .converge(
                submitted,
                None,
                ActionType::Created,
                self.resource.lifecycle().create.as_ref(),
                deadline,
            )
            .await
        {
            Ok(converged) => converged,
            Err(err) => {
                let id = match early_id {
                    Some(id) => Some(id),
                    None => self.work_request_target(first_work_request.as_ref()).await,
                };
                return Err(incomplete_create(id, err));
            }
        };

        let remote = match latest {
            Some(remote) => remote,
            None => self
                .fetch(&id)
                .await
                .map_err(|err| incomplete_create(Some(id.clone()), err))?,
        };

        let mut created = model.clone();
        created.set_id(Some(id.clone()));
        self.resource.apply_remote(&mut created, &remote);
        info!(id = %id, "Resource created");
        Ok(created)
    }

    /// Refresh state from the service.
    ///
    /// A resource that is gone, or that reports a state its delete would
    /// wait for, yields [`ReadOutcome::Gone`].
    #[instrument(skip(self, model), fields(resource_type = %self.type_name()))]
    pub async fn read(&self, model: &R::Model) -> Result<ReadOutcome<R::Model>> {
        let id = model
            .id()
            .ok_or_else(|| ProviderError::MissingId(self.type_name().to_string()))?;

        let remote = match self.fetch(id).await {
            Ok(remote) => remote,
            Err(err) if err.is_not_found() => {
                info!(id = %id, "Resource not found, removing from state");
                return Ok(ReadOutcome::Gone);
            }
            Err(err) => return Err(err),
        };

        if let Some(delete) = &self.resource.lifecycle().delete
            && delete.classify(&self.resource.lifecycle_state(&remote)) == StateClass::Target
        {
            info!(id = %id, "Resource is deleted, removing from state");
            return Ok(ReadOutcome::Gone);
        }

        let mut refreshed = model.clone();
        self.resource.apply_remote(&mut refreshed, &remote);
        Ok(ReadOutcome::Found(refreshed))
    }

    /// Update mutable attributes in place.
    ///
    /// Fails with [`ProviderError::ForceNewChange`] when a ForceNew attribute
    /// changed. Makes no service call when nothing changed.
    #[instrument(skip(self, prior, desired), fields(resource_type = %self.type_name()))]
    pub async fn update(&self, prior: &R::Model, desired: &R::Model) -> Result<R::Model> {
        let id = prior
            .id()
            .ok_or_else(|| ProviderError::MissingId(self.type_name().to_string()))?
            .to_string();
        if let Some(desired_id) = desired.id()
            && desired_id != id
        {
            return Err(ProviderError::validation("id", "the id of a resource cannot change"));
        }

        let spec = self.resource.spec();
        let desired_state = ResourceState::from_model(desired)?;
        let changes = spec.diff(&ResourceState::from_model(prior)?, &desired_state);

        let force_new = changes.force_new(spec);
        if !force_new.is_empty() {
            return Err(ProviderError::ForceNewChange {
                attributes: force_new,
            });
        }
        if changes.is_empty() {
            debug!(id = %id, "No changes to apply");
            return Ok(prior.clone());
        }
        spec.validate_required(&desired_state)?;

        let deadline = Instant::now() + self.timeouts.update;
        let request = self.resource.update_request(prior, desired, &changes)?;
        let resource = &self.resource;
        let id_ref = id.as_str();

        let mut latest = None;
        for step in self.resource.update_steps(request) {
            let submitted = self
                .retry
                .execute("update", || resource.update(id_ref, step.clone()))
                .await?;

            let (converged_id, remote) = self
                .converge(
                    submitted,
                    Some(id_ref),
                    ActionType::Updated,
                    self.resource.lifecycle().update.as_ref(),
                    deadline,
                )
                .await?;
            if converged_id != id {
                return Err(ProviderError::Other(format!(
                    "update of {} reported a different resource {}",
                    id, converged_id
                )));
            }
            latest = remote;
        }

        let remote = match latest {
            Some(remote) => remote,
            None => self.fetch(&id).await?,
        };

        let mut updated = desired.clone();
        updated.set_id(Some(id.clone()));
        self.resource.apply_remote(&mut updated, &remote);
        info!(id = %id, changed = ?changes.names(), "Resource updated");
        Ok(updated)
    }

    /// Delete the resource and wait for it to disappear.
    ///
    /// A resource that is already gone counts as deleted.
    #[instrument(skip(self, model), fields(resource_type = %self.type_name()))]
    pub async fn delete(&self, model: &R::Model) -> Result<()> {
        let Some(id) = model.id() else {
            return Ok(());
        };

        let deadline = Instant::now() + self.timeouts.delete;
        let retry = self.retry.clone().with_not_found_retries(false);
        let resource = &self.resource;

        let handle = match retry.execute("delete", || resource.delete(id)).await {
            Ok(handle) => handle,
            Err(err) if err.is_not_found() => {
                info!(id = %id, "Resource already deleted");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let submitted = match handle {
            Some(handle) => Submitted::work_request(handle),
            None => Submitted::Accepted {
                work_requests: Vec::new(),
                resource: None,
            },
        };

        match self
            .converge(
                submitted,
                Some(id),
                ActionType::Deleted,
                self.resource.lifecycle().delete.as_ref(),
                deadline,
            )
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        info!(id = %id, "Resource deleted");
        Ok(())
    }

    /// Decide what applying `desired` over `prior` requires.
    pub fn plan(&self, prior: Option<&R::Model>, desired: Option<&R::Model>) -> Result<Plan> {
        let prior = prior.map(ResourceState::from_model).transpose()?;
        let desired = desired.map(ResourceState::from_model).transpose()?;
        Ok(self.resource.spec().plan(prior.as_ref(), desired.as_ref()))
    }

    /// Plan and execute. Replacement deletes the old instance before
    /// creating the new one; deletion returns `None`.
    #[instrument(skip(self, prior, desired), fields(resource_type = %self.type_name()))]
    pub async fn apply(
        &self,
        prior: Option<&R::Model>,
        desired: Option<&R::Model>,
    ) -> Result<Option<R::Model>> {
        let plan = self.plan(prior, desired)?;
        debug!(plan = ?plan, "Applying plan");

        match (plan, prior, desired) {
            (Plan::Create, _, Some(desired)) => {
                let mut fresh = desired.clone();
                fresh.set_id(None);
                self.create(&fresh).await.map(Some)
            }
            (Plan::Update { .. }, Some(prior), Some(desired)) => {
                self.update(prior, desired).await.map(Some)
            }
            (Plan::Replace { force_new }, Some(prior), Some(desired)) => {
                info!(attributes = ?force_new, "Replacing resource");
                self.delete(prior).await?;
                let mut fresh = desired.clone();
                fresh.set_id(None);
                self.create(&fresh).await.map(Some)
            }
            (Plan::Delete, Some(prior), _) => {
                self.delete(prior).await?;
                Ok(None)
            }
            (_, prior, _) => Ok(prior.cloned()),
        }
    }

    /// Bring an existing resource under management by id.
    #[instrument(skip(self), fields(resource_type = %self.type_name()))]
    pub async fn import(&self, id: &str) -> Result<R::Model> {
        let remote = self.fetch(id).await?;
        let mut model = R::Model::default();
        model.set_id(Some(self.resource.remote_id(&remote)));
        self.resource.apply_remote(&mut model, &remote);
        info!(id = %id, "Resource imported");
        Ok(model)
    }

    async fn fetch(&self, id: &str) -> Result<R::Remote> {
        let resource = &self.resource;
        self.retry.execute("get", || resource.get(id)).await
    }

    fn submitted_id(&self, submitted: &Submitted<R::Remote>) -> Option<String> {
        match submitted {
            Submitted::Done(remote) => Some(self.resource.remote_id(remote)),
            Submitted::Accepted {
                resource: Some(remote),
                ..
            } => Some(self.resource.remote_id(remote)),
            Submitted::Accepted { resource: None, .. } => None,
        }
    }

    /// Identifier of the resource a work request is acting on, whatever its
    /// progress. Lookup failures yield `None`.
    async fn work_request_target(&self, handle: Option<&WorkRequestHandle>) -> Option<String> {
        let handle = handle?;
        let binding = self.resource.work_requests()?;
        let client = &binding.client;
        let request = self
            .retry
            .bounded_by(TARGET_LOOKUP_BUDGET)
            .execute("get_work_request", || client.get_work_request(handle.as_str()))
            .await
            .ok()?;
        request
            .target(&binding.entity_type)
            .map(str::to_string)
    }

    /// Wait for a submitted mutation to settle.
    ///
    /// Work requests are waited on first, then the lifecycle set (if the
    /// operation has one) is polled. Returns the resource id and the last
    /// remote snapshot seen while polling.
    async fn converge(
        &self,
        submitted: Submitted<R::Remote>,
        known_id: Option<&str>,
        action: ActionType,
        states: Option<&LifecycleStateSet>,
        deadline: Instant,
    ) -> Result<(String, Option<R::Remote>)> {
        let mut latest = None;
        let mut id = known_id.map(str::to_string);

        match submitted {
            Submitted::Done(remote) => {
                id.get_or_insert_with(|| self.resource.remote_id(&remote));
                latest = Some(remote);
            }
            Submitted::Accepted {
                work_requests,
                resource,
            } => {
                if let Some(remote) = &resource {
                    id.get_or_insert_with(|| self.resource.remote_id(remote));
                }
                if !work_requests.is_empty() {
                    let binding = self.resource.work_requests().ok_or_else(|| {
                        ProviderError::Other(format!(
                            "{} returned a work request but has no work request client",
                            self.type_name()
                        ))
                    })?;
                    let waiter = WorkRequestWaiter::new(binding.client, self.retry.clone())
                        .with_poll_config(self.poll.clone());
                    for handle in &work_requests {
                        let affected = waiter
                            .wait(handle, &binding.entity_type, action, remaining(deadline))
                            .await?;
                        if let Some(affected) = affected {
                            id.get_or_insert(affected);
                        }
                    }
                }
            }
        }

        let id = id.ok_or_else(|| ProviderError::MissingId(self.type_name().to_string()))?;

        if let Some(states) = states {
            let poller = LifecyclePoller::new(self.poll.clone());
            let retry = if states.not_found_is_target() {
                self.retry.clone().with_not_found_retries(false)
            } else {
                self.retry.clone()
            };
            let retry = &retry;
            let resource = &self.resource;
            let id_ref = id.as_str();

            latest = poller
                .wait_for(
                    id_ref,
                    states,
                    remaining(deadline),
                    move || {
                        let bounded = retry.bounded_by(remaining(deadline));
                        async move { bounded.execute("get", move || resource.get(id_ref)).await }
                    },
                    |remote| resource.lifecycle_state(remote),
                )
                .await?;
        }

        Ok((id, latest))
    }
}

fn incomplete_create(id: Option<String>, source: ProviderError) -> ProviderError {
    match id {
        Some(id) => {
            warn!(id = %id, error = %source, "Resource created but did not converge");
            ProviderError::CreateIncomplete {
                id,
                source: Box::new(source),
            }
        }
        None => source,
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}
