// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource schemas, change sets and plans.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;

use crate::error::{ProviderError, Result};
use crate::state::ResourceState;

/// Default timeout for each mutating operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Semantic type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// String.
    String,
    /// Integer.
    Int,
    /// Floating point number.
    Float,
    /// Boolean.
    Bool,
    /// String-keyed map.
    Map,
    /// Ordered list.
    List,
    /// Unordered set.
    Set,
    /// Nested object.
    Object,
}

/// Who sets an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeMode {
    /// The user must set it.
    Required,
    /// The user may set it.
    Optional,
    /// Only the service sets it.
    Computed,
    /// The user may set it; otherwise the service fills it in.
    OptionalComputed,
}

/// Schema of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSchema {
    /// Semantic type.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Who sets it.
    pub mode: AttributeMode,
    /// Changing it requires replacing the resource.
    #[serde(default)]
    pub force_new: bool,
    /// Value must not be logged or displayed.
    #[serde(default)]
    pub sensitive: bool,
    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AttributeSchema {
    fn with_mode(attr_type: AttributeType, mode: AttributeMode) -> Self {
        Self {
            attr_type,
            mode,
            force_new: false,
            sensitive: false,
            description: None,
        }
    }

    /// A required attribute.
    pub fn required(attr_type: AttributeType) -> Self {
        Self::with_mode(attr_type, AttributeMode::Required)
    }

    /// An optional attribute.
    pub fn optional(attr_type: AttributeType) -> Self {
        Self::with_mode(attr_type, AttributeMode::Optional)
    }

    /// A computed attribute.
    pub fn computed(attr_type: AttributeType) -> Self {
        Self::with_mode(attr_type, AttributeMode::Computed)
    }

    /// An optional attribute the service fills in when unset.
    pub fn optional_computed(attr_type: AttributeType) -> Self {
        Self::with_mode(attr_type, AttributeMode::OptionalComputed)
    }

    /// Mark as ForceNew.
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Mark as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Attach a description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the user can set this attribute.
    pub fn is_user_settable(&self) -> bool {
        self.mode != AttributeMode::Computed
    }
}

/// Per-operation timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Create timeout.
    #[serde(with = "duration_secs")]
    pub create: Duration,
    /// Update timeout.
    #[serde(with = "duration_secs")]
    pub update: Duration,
    /// Delete timeout.
    #[serde(with = "duration_secs")]
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_TIMEOUT)
    }
}

impl Timeouts {
    /// Same timeout for every operation.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            update: timeout,
            delete: timeout,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

/// Schema of a resource or data source type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Type name, e.g. `oci_streaming_stream`.
    pub type_name: String,
    /// Service the type belongs to (selects the retry profile).
    pub service: String,
    /// Attribute table.
    pub attributes: BTreeMap<String, AttributeSchema>,
    /// Default timeouts.
    pub timeouts: Timeouts,
}

impl ResourceSpec {
    /// Start a spec with an `id` computed attribute and default timeouts.
    pub fn new(type_name: impl Into<String>, service: impl Into<String>) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            "id".to_string(),
            AttributeSchema::computed(AttributeType::String),
        );
        Self {
            type_name: type_name.into(),
            service: service.into(),
            attributes,
            timeouts: Timeouts::default(),
        }
    }

    /// Add an attribute.
    pub fn attribute(mut self, name: impl Into<String>, schema: AttributeSchema) -> Self {
        self.attributes.insert(name.into(), schema);
        self
    }

    /// Override the default timeouts.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Names of ForceNew attributes.
    pub fn force_new_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|(_, a)| a.force_new)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Check that every Required attribute is present and non-null.
    pub fn validate_required(&self, state: &ResourceState) -> Result<()> {
        for (name, attr) in &self.attributes {
            if attr.mode == AttributeMode::Required && is_unset(state.get(name)) {
                return Err(ProviderError::validation(name, "required attribute is not set"));
            }
        }
        Ok(())
    }

    /// Attributes whose user-visible value differs between `prior` and `desired`.
    ///
    /// Computed attributes never count. An OptionalComputed attribute left
    /// unset in `desired` keeps whatever the service assigned.
    pub fn diff(&self, prior: &ResourceState, desired: &ResourceState) -> ChangeSet {
        let changed = self
            .attributes
            .iter()
            .filter(|(name, attr)| {
                let old = prior.get(name);
                let new = desired.get(name);
                match attr.mode {
                    AttributeMode::Computed => false,
                    AttributeMode::OptionalComputed if is_unset(new) => false,
                    _ => !same_value(old, new),
                }
            })
            .map(|(name, _)| name.clone())
            .collect();
        ChangeSet { changed }
    }

    /// Decide what applying `desired` over `prior` requires.
    pub fn plan(&self, prior: Option<&ResourceState>, desired: Option<&ResourceState>) -> Plan {
        match (prior, desired) {
            (None, None) => Plan::NoOp,
            (None, Some(_)) => Plan::Create,
            (Some(_), None) => Plan::Delete,
            (Some(prior), Some(desired)) => {
                let changes = self.diff(prior, desired);
                if changes.is_empty() {
                    return Plan::NoOp;
                }
                let force_new = changes.force_new(self);
                if force_new.is_empty() {
                    Plan::Update {
                        changed: changes.names(),
                    }
                } else {
                    Plan::Replace { force_new }
                }
            }
        }
    }
}

fn is_unset(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn same_value(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (a, b) if is_unset(a) && is_unset(b) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Set of attributes that differ between prior and desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changed: BTreeSet<String>,
}

impl ChangeSet {
    /// Change set naming the given attributes.
    pub fn of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            changed: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` changed.
    pub fn contains(&self, name: &str) -> bool {
        self.changed.contains(name)
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Changed attribute names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.changed.iter().cloned().collect()
    }

    /// Changed attributes that are ForceNew in `spec`.
    pub fn force_new(&self, spec: &ResourceSpec) -> Vec<String> {
        self.changed
            .iter()
            .filter(|name| spec.attributes.get(*name).is_some_and(|a| a.force_new))
            .cloned()
            .collect()
    }
}

/// What applying a desired state requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Plan {
    /// Nothing exists yet.
    Create,
    /// Prior and desired agree.
    NoOp,
    /// Only mutable attributes changed.
    Update {
        /// Changed attributes.
        changed: Vec<String>,
    },
    /// At least one ForceNew attribute changed.
    Replace {
        /// Changed ForceNew attributes.
        force_new: Vec<String>,
    },
    /// The resource should no longer exist.
    Delete,
}
