// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! One-shot action resources.
//!
//! An action resource wraps an operation that is not a lifecycle-managed
//! object (downloading a wallet, rotating a key). Create runs the action
//! once and records its outputs. Read keeps state as it is and Delete only
//! forgets it. Every user attribute is ForceNew, so changing an input runs
//! the action again.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::error::{ProviderError, Result};
use crate::orchestrator::{ReadOutcome, ResourceModel};
use crate::schema::{Plan, ResourceSpec};
use crate::state::ResourceState;

/// A resource whose Create performs a one-shot action.
#[async_trait]
pub trait ActionResource: Send + Sync + 'static {
    /// Typed state: action inputs plus recorded outputs.
    type Model: ResourceModel;

    /// Schema of this type.
    fn spec(&self) -> &ResourceSpec;

    /// Identifier recorded for an executed action.
    fn derive_id(&self, model: &Self::Model) -> String;

    /// Run the action and return the model with its outputs filled in.
    async fn execute(&self, model: &Self::Model) -> Result<Self::Model>;
}

/// Drives an [`ActionResource`].
pub struct ActionOrchestrator<A: ActionResource> {
    action: Arc<A>,
    spec: ResourceSpec,
}

impl<A: ActionResource> Clone for ActionOrchestrator<A> {
    fn clone(&self) -> Self {
        Self {
            action: self.action.clone(),
            spec: self.spec.clone(),
        }
    }
}

impl<A: ActionResource> ActionOrchestrator<A> {
    /// Wrap an action; its user-settable attributes all become ForceNew.
    pub fn new(action: A) -> Self {
        let spec = Self::effective_spec(action.spec());
        Self {
            action: Arc::new(action),
            spec,
        }
    }

    /// `spec` as the orchestrator exposes it: every user-settable
    /// attribute ForceNew.
    pub fn effective_spec(spec: &ResourceSpec) -> ResourceSpec {
        let mut spec = spec.clone();
        for attr in spec.attributes.values_mut() {
            if attr.is_user_settable() {
                attr.force_new = true;
            }
        }
        spec
    }

    /// Effective schema (with ForceNew applied).
    pub fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    /// Run the action once.
    #[instrument(skip(self, model), fields(resource_type = %self.spec.type_name))]
    pub async fn create(&self, model: &A::Model) -> Result<A::Model> {
        self.spec
            .validate_required(&ResourceState::from_model(model)?)?;

        let mut executed = self.action.execute(model).await?;
        if executed.id().is_none() {
            let id = self.action.derive_id(&executed);
            executed.set_id(Some(id));
        }
        info!(id = executed.id().unwrap_or_default(), "Action executed");
        Ok(executed)
    }

    /// Keeps state unchanged.
    pub async fn read(&self, model: &A::Model) -> Result<ReadOutcome<A::Model>> {
        Ok(ReadOutcome::Found(model.clone()))
    }

    /// Every input is ForceNew, so an in-place update is never possible.
    pub async fn update(&self, prior: &A::Model, desired: &A::Model) -> Result<A::Model> {
        let changes = self.spec.diff(
            &ResourceState::from_model(prior)?,
            &ResourceState::from_model(desired)?,
        );
        if changes.is_empty() {
            return Ok(prior.clone());
        }
        Err(ProviderError::ForceNewChange {
            attributes: changes.names(),
        })
    }

    /// Forgets the resource; nothing is called.
    pub async fn delete(&self, _model: &A::Model) -> Result<()> {
        Ok(())
    }

    /// Decide what applying `desired` over `prior` requires.
    pub fn plan(&self, prior: Option<&A::Model>, desired: Option<&A::Model>) -> Result<Plan> {
        let prior = prior.map(ResourceState::from_model).transpose()?;
        let desired = desired.map(ResourceState::from_model).transpose()?;
        Ok(self.spec.plan(prior.as_ref(), desired.as_ref()))
    }

    /// Plan and execute.
    pub async fn apply(
        &self,
        prior: Option<&A::Model>,
        desired: Option<&A::Model>,
    ) -> Result<Option<A::Model>> {
        match (self.plan(prior, desired)?, desired) {
            (Plan::Create | Plan::Replace { .. }, Some(desired)) => {
                let mut fresh = desired.clone();
                fresh.set_id(None);
                self.create(&fresh).await.map(Some)
            }
            (Plan::Delete, _) => Ok(None),
            _ => Ok(prior.cloned()),
        }
    }

    /// Actions have nothing on the service side to import.
    pub async fn import(&self, _id: &str) -> Result<A::Model> {
        Err(ProviderError::Other(format!(
            "{} does not support import",
            self.spec.type_name
        )))
    }
}
