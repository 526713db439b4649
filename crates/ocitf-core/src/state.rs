// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Attribute-map resource state.
//!
//! This is the shape state takes at the registry boundary and on disk.
//! Resource code works with typed models and converts at the edges.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProviderError, Result};

/// Attribute name → JSON value for one resource instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceState(BTreeMap<String, Value>);

impl ResourceState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The service-assigned identifier, if set.
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Get an attribute.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Set an attribute.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value.into());
        self
    }

    /// Serialize a typed model into state.
    pub fn from_model<M: Serialize>(model: &M) -> Result<Self> {
        match serde_json::to_value(model)? {
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            other => Err(ProviderError::Serialization(format!(
                "resource model must serialize to an object, got {}",
                other
            ))),
        }
    }

    /// Deserialize state into a typed model.
    pub fn into_model<M: DeserializeOwned>(self) -> Result<M> {
        let map: serde_json::Map<String, Value> = self.0.into_iter().collect();
        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

impl From<BTreeMap<String, Value>> for ResourceState {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Model {
        id: Option<String>,
        name: String,
        #[serde(default)]
        partitions: Option<i64>,
    }

    #[test]
    fn test_model_conversion() {
        let model = Model {
            id: Some("ocid1.stream.oc1..x".to_string()),
            name: "s".to_string(),
            partitions: Some(3),
        };
        let state = ResourceState::from_model(&model).unwrap();
        assert_eq!(state.id(), Some("ocid1.stream.oc1..x"));
        assert_eq!(state.get("partitions"), Some(&json!(3)));

        let back: Model = state.into_model().unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn test_empty_id_is_none() {
        let state = ResourceState::new().with("id", "");
        assert_eq!(state.id(), None);
    }

    #[test]
    fn test_non_object_model_rejected() {
        assert!(ResourceState::from_model(&42).is_err());
    }

    #[test]
    fn test_missing_required_field_fails_conversion() {
        let state = ResourceState::new().with("id", "x");
        assert!(state.into_model::<Model>().is_err());
    }
}
