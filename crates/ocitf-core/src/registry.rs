// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Explicit provider registry.
//!
//! The registry is built once at startup and passed by reference to
//! whatever drives the provider. It maps type names to type-erased
//! handlers that speak [`ResourceState`], so callers can drive any
//! resource by name without knowing its model type.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = ProviderRegistry::new();
//! registry.register_resource(ResourceOrchestrator::new(LogGroupResource::new(client), &config))?;
//!
//! let handler = registry.resource("oci_logging_log_group")?;
//! let created = handler.create(desired).await?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::action::{ActionOrchestrator, ActionResource};
use crate::data_source::DataSource;
use crate::error::{ProviderError, Result};
use crate::orchestrator::{ReadOutcome, Resource, ResourceOrchestrator};
use crate::schema::{Plan, ResourceSpec};
use crate::state::ResourceState;

/// Type-erased resource driver.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Schema of the resource type.
    fn spec(&self) -> &ResourceSpec;

    /// Type name, e.g. `oci_logging_log_group`.
    fn type_name(&self) -> &str {
        &self.spec().type_name
    }

    /// Create from desired state.
    async fn create(&self, desired: ResourceState) -> Result<ResourceState>;

    /// Refresh state; `None` means the resource is gone.
    async fn read(&self, state: ResourceState) -> Result<Option<ResourceState>>;

    /// Update in place.
    async fn update(&self, prior: ResourceState, desired: ResourceState) -> Result<ResourceState>;

    /// Delete.
    async fn delete(&self, state: ResourceState) -> Result<()>;

    /// Import by id.
    async fn import(&self, id: &str) -> Result<ResourceState>;

    /// Plan a transition.
    fn plan(&self, prior: Option<&ResourceState>, desired: Option<&ResourceState>) -> Result<Plan>;

    /// Plan and execute a transition.
    async fn apply(
        &self,
        prior: Option<ResourceState>,
        desired: Option<ResourceState>,
    ) -> Result<Option<ResourceState>>;
}

fn to_model<M: serde::de::DeserializeOwned>(state: Option<ResourceState>) -> Result<Option<M>> {
    state.map(ResourceState::into_model).transpose()
}

fn to_state<M: Serialize>(model: Option<M>) -> Result<Option<ResourceState>> {
    model.as_ref().map(ResourceState::from_model).transpose()
}

#[async_trait]
impl<R: Resource> ResourceHandler for ResourceOrchestrator<R> {
    fn spec(&self) -> &ResourceSpec {
        ResourceOrchestrator::spec(self)
    }

    async fn create(&self, desired: ResourceState) -> Result<ResourceState> {
        let model = desired.into_model::<R::Model>()?;
        ResourceState::from_model(&ResourceOrchestrator::create(self, &model).await?)
    }

    async fn read(&self, state: ResourceState) -> Result<Option<ResourceState>> {
        let model = state.into_model::<R::Model>()?;
        match ResourceOrchestrator::read(self, &model).await? {
            ReadOutcome::Found(model) => ResourceState::from_model(&model).map(Some),
            ReadOutcome::Gone => Ok(None),
        }
    }

    async fn update(&self, prior: ResourceState, desired: ResourceState) -> Result<ResourceState> {
        let prior = prior.into_model::<R::Model>()?;
        let desired = desired.into_model::<R::Model>()?;
        ResourceState::from_model(&ResourceOrchestrator::update(self, &prior, &desired).await?)
    }

    async fn delete(&self, state: ResourceState) -> Result<()> {
        let model = state.into_model::<R::Model>()?;
        ResourceOrchestrator::delete(self, &model).await
    }

    async fn import(&self, id: &str) -> Result<ResourceState> {
        ResourceState::from_model(&ResourceOrchestrator::import(self, id).await?)
    }

    fn plan(&self, prior: Option<&ResourceState>, desired: Option<&ResourceState>) -> Result<Plan> {
        Ok(self.spec().plan(prior, desired))
    }

    async fn apply(
        &self,
        prior: Option<ResourceState>,
        desired: Option<ResourceState>,
    ) -> Result<Option<ResourceState>> {
        let prior = to_model::<R::Model>(prior)?;
        let desired = to_model::<R::Model>(desired)?;
        to_state(ResourceOrchestrator::apply(self, prior.as_ref(), desired.as_ref()).await?)
    }
}

#[async_trait]
impl<A: ActionResource> ResourceHandler for ActionOrchestrator<A> {
    fn spec(&self) -> &ResourceSpec {
        ActionOrchestrator::spec(self)
    }

    async fn create(&self, desired: ResourceState) -> Result<ResourceState> {
        let model = desired.into_model::<A::Model>()?;
        ResourceState::from_model(&ActionOrchestrator::create(self, &model).await?)
    }

    async fn read(&self, state: ResourceState) -> Result<Option<ResourceState>> {
        let model = state.into_model::<A::Model>()?;
        match ActionOrchestrator::read(self, &model).await? {
            ReadOutcome::Found(model) => ResourceState::from_model(&model).map(Some),
            ReadOutcome::Gone => Ok(None),
        }
    }

    async fn update(&self, prior: ResourceState, desired: ResourceState) -> Result<ResourceState> {
        let prior = prior.into_model::<A::Model>()?;
        let desired = desired.into_model::<A::Model>()?;
        ResourceState::from_model(&ActionOrchestrator::update(self, &prior, &desired).await?)
    }

    async fn delete(&self, state: ResourceState) -> Result<()> {
        let model = state.into_model::<A::Model>()?;
        ActionOrchestrator::delete(self, &model).await
    }

    async fn import(&self, id: &str) -> Result<ResourceState> {
        ResourceState::from_model(&ActionOrchestrator::import(self, id).await?)
    }

    fn plan(&self, prior: Option<&ResourceState>, desired: Option<&ResourceState>) -> Result<Plan> {
        Ok(ActionOrchestrator::spec(self).plan(prior, desired))
    }

    async fn apply(
        &self,
        prior: Option<ResourceState>,
        desired: Option<ResourceState>,
    ) -> Result<Option<ResourceState>> {
        let prior = to_model::<A::Model>(prior)?;
        let desired = to_model::<A::Model>(desired)?;
        to_state(ActionOrchestrator::apply(self, prior.as_ref(), desired.as_ref()).await?)
    }
}

/// Schemas of everything a provider exposes.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSchema {
    /// Resource schemas by type name.
    pub resources: BTreeMap<String, ResourceSpec>,
    /// Data source schemas by type name.
    pub data_sources: BTreeMap<String, ResourceSpec>,
}

/// Type name → handler for every resource and data source of the provider.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    resources: BTreeMap<String, Arc<dyn ResourceHandler>>,
    data_sources: BTreeMap<String, Arc<dyn DataSource>>,
}

impl ProviderRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource handler under its type name.
    pub fn register_resource(&mut self, handler: impl ResourceHandler + 'static) -> Result<()> {
        let name = handler.type_name().to_string();
        if self.resources.contains_key(&name) {
            return Err(ProviderError::DuplicateRegistration(name));
        }
        debug!(type_name = %name, "Registered resource");
        self.resources.insert(name, Arc::new(handler));
        Ok(())
    }

    /// Register a data source under its type name.
    pub fn register_data_source(&mut self, data_source: impl DataSource + 'static) -> Result<()> {
        let name = data_source.spec().type_name.clone();
        if self.data_sources.contains_key(&name) {
            return Err(ProviderError::DuplicateRegistration(name));
        }
        debug!(type_name = %name, "Registered data source");
        self.data_sources.insert(name, Arc::new(data_source));
        Ok(())
    }

    /// Look up a resource handler.
    pub fn resource(&self, name: &str) -> Result<Arc<dyn ResourceHandler>> {
        self.resources
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownType(name.to_string()))
    }

    /// Look up a data source.
    pub fn data_source(&self, name: &str) -> Result<Arc<dyn DataSource>> {
        self.data_sources
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownType(name.to_string()))
    }

    /// Registered resource type names, sorted.
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Registered data source type names, sorted.
    pub fn data_source_names(&self) -> Vec<&str> {
        self.data_sources.keys().map(String::as_str).collect()
    }

    /// Schemas of every registered type.
    pub fn schemas(&self) -> ProviderSchema {
        ProviderSchema {
            resources: self
                .resources
                .iter()
                .map(|(name, handler)| (name.clone(), handler.spec().clone()))
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|(name, ds)| (name.clone(), ds.spec().clone()))
                .collect(),
        }
    }
}
