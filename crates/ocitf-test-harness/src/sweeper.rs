// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Sweeping leftover test resources out of a compartment.
//!
//! A [`Sweeper`] lists and deletes one resource type. The [`SweepRunner`]
//! walks the types in [`DependencyGraph::sweep_order`] so dependents go
//! first. Resources whose ids are listed as defaults (the pre-provisioned
//! fixtures every test run relies on) are never deleted. A failed delete is
//! recorded and the sweep moves on.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use ocitf_core::{DataSource, ProviderRegistry, ResourceHandler};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::HarnessError;
use crate::graph::DependencyGraph;

/// Lists and deletes resources of one type.
#[async_trait]
pub trait Sweeper: Send + Sync {
    fn resource_type(&self) -> &str;

    /// Ids of live resources of this type in the compartment.
    async fn list(&self, compartment_id: &str) -> Result<Vec<String>, HarnessError>;

    async fn delete(&self, id: &str) -> Result<(), HarnessError>;
}

/// Sweeps through a resource handler and the matching list data source of
/// a registry.
struct RegistrySweep {
    resource: Arc<dyn ResourceHandler>,
    data_source: Arc<dyn DataSource>,
    /// Key of the item list in the data source output.
    items_key: &'static str,
    /// States that mean the resource is already on its way out.
    skip_states: &'static [&'static str],
}

impl RegistrySweep {
    fn new(
        registry: &ProviderRegistry,
        resource_type: &str,
        data_source_type: &str,
        items_key: &'static str,
        skip_states: &'static [&'static str],
    ) -> Result<Self, HarnessError> {
        Ok(Self {
            resource: registry.resource(resource_type)?,
            data_source: registry.data_source(data_source_type)?,
            items_key,
            skip_states,
        })
    }

    async fn list(&self, compartment_id: &str) -> Result<Vec<String>, HarnessError> {
        let out = self
            .data_source
            .read(json!({ "compartment_id": compartment_id }))
            .await?;
        let items = out
            .get(self.items_key)
            .and_then(Value::as_array)
            .ok_or_else(|| HarnessError::MalformedListing {
                resource_type: self.resource.type_name().to_string(),
                message: format!("missing `{}` list", self.items_key),
            })?;

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let state = item.get("state").and_then(Value::as_str).unwrap_or_default();
            if self.skip_states.contains(&state) {
                continue;
            }
            let id = item.get("id").and_then(Value::as_str).ok_or_else(|| {
                HarnessError::MalformedListing {
                    resource_type: self.resource.type_name().to_string(),
                    message: "item without id".to_string(),
                }
            })?;
            ids.push(id.to_string());
        }
        Ok(ids)
    }

    /// Import to get full state, then delete through the orchestrator.
    async fn delete(&self, id: &str) -> Result<(), HarnessError> {
        let state = match self.resource.import(id).await {
            Ok(state) => state,
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        self.resource.delete(state).await?;
        Ok(())
    }
}

/// Sweeps `oci_logging_log_group`.
pub struct LogGroupSweeper(RegistrySweep);

impl LogGroupSweeper {
    pub fn new(registry: &ProviderRegistry) -> Result<Self, HarnessError> {
        RegistrySweep::new(
            registry,
            "oci_logging_log_group",
            "oci_logging_log_groups",
            "log_groups",
            &["DELETING"],
        )
        .map(Self)
    }
}

#[async_trait]
impl Sweeper for LogGroupSweeper {
    fn resource_type(&self) -> &str {
        self.0.resource.type_name()
    }

    async fn list(&self, compartment_id: &str) -> Result<Vec<String>, HarnessError> {
        self.0.list(compartment_id).await
    }

    async fn delete(&self, id: &str) -> Result<(), HarnessError> {
        self.0.delete(id).await
    }
}

/// Sweeps `oci_streaming_stream`.
pub struct StreamSweeper(RegistrySweep);

impl StreamSweeper {
    pub fn new(registry: &ProviderRegistry) -> Result<Self, HarnessError> {
        RegistrySweep::new(
            registry,
            "oci_streaming_stream",
            "oci_streaming_streams",
            "streams",
            &["DELETING", "DELETED"],
        )
        .map(Self)
    }
}

#[async_trait]
impl Sweeper for StreamSweeper {
    fn resource_type(&self) -> &str {
        self.0.resource.type_name()
    }

    async fn list(&self, compartment_id: &str) -> Result<Vec<String>, HarnessError> {
        self.0.list(compartment_id).await
    }

    async fn delete(&self, id: &str) -> Result<(), HarnessError> {
        self.0.delete(id).await
    }
}

/// What a sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// (resource type, id) in deletion order.
    pub deleted: Vec<(String, String)>,
    /// Default resources left alone.
    pub skipped: Vec<(String, String)>,
    /// (resource type, id, error).
    pub failed: Vec<(String, String, String)>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs sweepers in dependency order.
pub struct SweepRunner {
    graph: DependencyGraph,
    sweepers: BTreeMap<String, Arc<dyn Sweeper>>,
    default_resource_ids: BTreeSet<String>,
}

impl SweepRunner {
    pub fn new(graph: DependencyGraph) -> Self {
        Self {
            graph,
            sweepers: BTreeMap::new(),
            default_resource_ids: BTreeSet::new(),
        }
    }

    /// Runner with the log group and stream sweepers over `registry`.
    pub fn for_registry(
        registry: &ProviderRegistry,
        graph: DependencyGraph,
    ) -> Result<Self, HarnessError> {
        Ok(Self::new(graph)
            .with_sweeper(LogGroupSweeper::new(registry)?)
            .with_sweeper(StreamSweeper::new(registry)?))
    }

    /// Add a sweeper; its type joins the graph if it is not there yet.
    pub fn with_sweeper(mut self, sweeper: impl Sweeper + 'static) -> Self {
        let resource_type = sweeper.resource_type().to_string();
        self.graph.add_resource(resource_type.clone());
        self.sweepers.insert(resource_type, Arc::new(sweeper));
        self
    }

    /// Ids that must survive every sweep.
    pub fn with_default_resource_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_resource_ids
            .extend(ids.into_iter().map(Into::into));
        self
    }

    /// Delete every non-default resource of every swept type in the
    /// compartment.
    pub async fn sweep(&self, compartment_id: &str) -> Result<SweepReport, HarnessError> {
        let order = self.graph.sweep_order()?;
        let mut report = SweepReport::default();

        for resource_type in order {
            let Some(sweeper) = self.sweepers.get(&resource_type) else {
                debug!(resource_type = %resource_type, "No sweeper, skipping type");
                continue;
            };

            let ids = sweeper.list(compartment_id).await?;
            debug!(resource_type = %resource_type, count = ids.len(), "Listed resources to sweep");

            for id in ids {
                if self.default_resource_ids.contains(&id) {
                    report.skipped.push((resource_type.clone(), id));
                    continue;
                }
                match sweeper.delete(&id).await {
                    Ok(()) => {
                        info!(resource_type = %resource_type, id = %id, "Swept resource");
                        report.deleted.push((resource_type.clone(), id));
                    }
                    Err(err) => {
                        warn!(resource_type = %resource_type, id = %id, error = %err, "Failed to sweep resource");
                        report
                            .failed
                            .push((resource_type.clone(), id, err.to_string()));
                    }
                }
            }
        }

        Ok(report)
    }
}
