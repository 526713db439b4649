// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource type dependency graph.
//!
//! Edges point from a resource type to the types it depends on (a log
//! depends on its log group). Sweeping must remove dependents before the
//! resources they depend on.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::HarnessError;

/// Resource type → the resource types it depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource type with no dependencies (no-op if known).
    pub fn add_resource(&mut self, resource_type: impl Into<String>) {
        self.dependencies.entry(resource_type.into()).or_default();
    }

    /// Record that `resource_type` depends on `dependency`. Both become nodes.
    pub fn add_dependency(
        &mut self,
        resource_type: impl Into<String>,
        dependency: impl Into<String>,
    ) {
        let dependency = dependency.into();
        self.add_resource(dependency.clone());
        self.dependencies
            .entry(resource_type.into())
            .or_default()
            .insert(dependency);
    }

    pub fn with_dependency(
        mut self,
        resource_type: impl Into<String>,
        dependency: impl Into<String>,
    ) -> Self {
        self.add_dependency(resource_type, dependency);
        self
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.dependencies.contains_key(resource_type)
    }

    pub fn dependencies_of(&self, resource_type: &str) -> Vec<&str> {
        self.dependencies
            .get(resource_type)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Order in which to sweep: every type comes before the types it depends
    /// on. Ties are broken alphabetically.
    pub fn sweep_order(&self) -> Result<Vec<String>, HarnessError> {
        let mut dependents: BTreeMap<&str, usize> = self
            .dependencies
            .keys()
            .map(|name| (name.as_str(), 0))
            .collect();
        for deps in self.dependencies.values() {
            for dep in deps {
                if let Some(count) = dependents.get_mut(dep.as_str()) {
                    *count += 1;
                }
            }
        }

        let mut ready: BTreeSet<&str> = dependents
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut order = Vec::with_capacity(self.dependencies.len());

        while let Some(name) = ready.pop_first() {
            order.push(name.to_string());
            for dep in self.dependencies.get(name).into_iter().flatten() {
                if let Some(count) = dependents.get_mut(dep.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dep.as_str());
                    }
                }
            }
        }

        if order.len() < self.dependencies.len() {
            let blocked = dependents
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(name, _)| name.to_string())
                .collect();
            return Err(HarnessError::DependencyCycle(blocked));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependents_come_first() {
        let graph = DependencyGraph::new()
            .with_dependency("oci_logging_log", "oci_logging_log_group")
            .with_dependency("oci_sch_service_connector", "oci_logging_log")
            .with_dependency("oci_sch_service_connector", "oci_streaming_stream");

        let order = graph.sweep_order().unwrap();
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();

        assert_eq!(order.len(), 4);
        assert!(pos("oci_sch_service_connector") < pos("oci_logging_log"));
        assert!(pos("oci_logging_log") < pos("oci_logging_log_group"));
        assert!(pos("oci_sch_service_connector") < pos("oci_streaming_stream"));
    }

    #[test]
    fn test_independent_types_are_alphabetical() {
        let mut graph = DependencyGraph::new();
        graph.add_resource("oci_streaming_stream");
        graph.add_resource("oci_logging_log_group");
        assert_eq!(
            graph.sweep_order().unwrap(),
            vec!["oci_logging_log_group", "oci_streaming_stream"]
        );
    }

    #[test]
    fn test_cycle_is_rejected() {
        let graph = DependencyGraph::new()
            .with_dependency("a", "b")
            .with_dependency("b", "c")
            .with_dependency("c", "a")
            .with_dependency("d", "a");

        match graph.sweep_order() {
            Err(HarnessError::DependencyCycle(types)) => {
                assert_eq!(types, vec!["a", "b", "c"]);
            }
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_dependencies_of() {
        let graph = DependencyGraph::new().with_dependency("log", "log_group");
        assert_eq!(graph.dependencies_of("log"), vec!["log_group"]);
        assert!(graph.dependencies_of("log_group").is_empty());
        assert!(graph.dependencies_of("unknown").is_empty());
        assert!(graph.contains("log_group"));
    }
}
