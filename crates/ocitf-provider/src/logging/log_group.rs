// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! `oci_logging_log_group`

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ocitf_core::mapping::{defined_tags_from_response, optional_defined_tags};
use ocitf_core::{
    AttributeSchema, AttributeType, ChangeSet, LifecycleStateSet, Resource, ResourceLifecycle,
    ResourceModel, ResourceSpec, Result, Submitted, WorkRequestBinding, WorkRequestClient,
    WorkRequestHandle,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    CreateLogGroupDetails, LOG_GROUP_ENTITY_TYPE, LogGroup, LoggingClient, UpdateLogGroupDetails,
};

/// Local state of a log group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogGroupModel {
    #[serde(default)]
    pub id: Option<String>,
    pub compartment_id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub defined_tags: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub freeform_tags: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub time_created: Option<String>,
    #[serde(default)]
    pub time_last_modified: Option<String>,
}

impl ResourceModel for LogGroupModel {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }
}

impl LogGroupModel {
    /// Model with every attribute taken from the service representation.
    pub fn from_remote(remote: &LogGroup) -> Self {
        let mut model = Self {
            id: Some(remote.id.clone()),
            ..Default::default()
        };
        write_remote(&mut model, remote);
        model
    }
}

/// Response mapping. Computed attributes are always written, optional ones
/// only when the service returned them.
fn write_remote(model: &mut LogGroupModel, remote: &LogGroup) {
    model.compartment_id = remote.compartment_id.clone();
    model.display_name = remote.display_name.clone();
    if let Some(description) = &remote.description {
        model.description = Some(description.clone());
    }
    model.defined_tags = Some(defined_tags_from_response(&remote.defined_tags));
    model.freeform_tags = Some(remote.freeform_tags.clone());
    model.state = Some(remote.lifecycle_state.to_string());
    model.time_created = Some(remote.time_created.to_rfc3339());
    model.time_last_modified = Some(remote.time_last_modified.to_rfc3339());
}

/// Schema of `oci_logging_log_group`.
pub fn log_group_spec() -> ResourceSpec {
    ResourceSpec::new("oci_logging_log_group", "logging")
        .attribute(
            "compartment_id",
            AttributeSchema::required(AttributeType::String)
                .describe("OCID of the compartment that holds the log group"),
        )
        .attribute(
            "display_name",
            AttributeSchema::required(AttributeType::String)
                .describe("Unique name of the log group within the compartment"),
        )
        .attribute("description", AttributeSchema::optional(AttributeType::String))
        .attribute("defined_tags", AttributeSchema::optional_computed(AttributeType::Map))
        .attribute("freeform_tags", AttributeSchema::optional_computed(AttributeType::Map))
        .attribute("state", AttributeSchema::computed(AttributeType::String))
        .attribute("time_created", AttributeSchema::computed(AttributeType::String))
        .attribute("time_last_modified", AttributeSchema::computed(AttributeType::String))
}

/// Calls needed to apply a log group update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogGroupUpdate {
    /// Move to this compartment first.
    pub compartment_id: Option<String>,
    /// Then apply these changes.
    pub details: Option<UpdateLogGroupDetails>,
}

impl LogGroupUpdate {
    /// The compartment move and the attribute update as separate steps, in
    /// that order. The service rejects an update while a move is running.
    pub fn into_steps(self) -> Vec<LogGroupUpdate> {
        let mut steps = Vec::new();
        if let Some(compartment_id) = self.compartment_id {
            steps.push(LogGroupUpdate {
                compartment_id: Some(compartment_id),
                details: None,
            });
        }
        if let Some(details) = self.details {
            steps.push(LogGroupUpdate {
                compartment_id: None,
                details: Some(details),
            });
        }
        steps
    }
}

/// Log group resource; converges through Logging work requests.
pub struct LogGroupResource {
    client: Arc<dyn LoggingClient>,
    work_requests: Arc<dyn WorkRequestClient>,
    spec: ResourceSpec,
    lifecycle: ResourceLifecycle,
}

impl LogGroupResource {
    pub fn new(
        client: Arc<dyn LoggingClient>,
        work_requests: Arc<dyn WorkRequestClient>,
    ) -> Result<Self> {
        // Work requests do the waiting; the sets only confirm the final state.
        let lifecycle = ResourceLifecycle::none()
            .with_create(LifecycleStateSet::new(&[], &["ACTIVE"])?)
            .with_update(LifecycleStateSet::new(&[], &["ACTIVE"])?);
        Ok(Self {
            client,
            work_requests,
            spec: log_group_spec(),
            lifecycle,
        })
    }
}

#[async_trait]
impl Resource for LogGroupResource {
    type Model = LogGroupModel;
    type Remote = LogGroup;
    type CreateRequest = CreateLogGroupDetails;
    type UpdateRequest = LogGroupUpdate;

    fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    fn lifecycle(&self) -> &ResourceLifecycle {
        &self.lifecycle
    }

    fn work_requests(&self) -> Option<WorkRequestBinding> {
        Some(WorkRequestBinding {
            client: self.work_requests.clone(),
            entity_type: LOG_GROUP_ENTITY_TYPE.to_string(),
        })
    }

    fn create_request(&self, model: &LogGroupModel) -> Result<CreateLogGroupDetails> {
        Ok(CreateLogGroupDetails {
            compartment_id: model.compartment_id.clone(),
            display_name: model.display_name.clone(),
            description: model.description.clone(),
            defined_tags: optional_defined_tags(model.defined_tags.as_ref())?,
            freeform_tags: model.freeform_tags.clone(),
        })
    }

    fn update_request(
        &self,
        _prior: &LogGroupModel,
        desired: &LogGroupModel,
        changes: &ChangeSet,
    ) -> Result<LogGroupUpdate> {
        let details = UpdateLogGroupDetails {
            display_name: changes
                .contains("display_name")
                .then(|| desired.display_name.clone()),
            // An empty description clears it.
            description: changes
                .contains("description")
                .then(|| desired.description.clone().unwrap_or_default()),
            defined_tags: if changes.contains("defined_tags") {
                Some(optional_defined_tags(desired.defined_tags.as_ref())?.unwrap_or_default())
            } else {
                None
            },
            freeform_tags: changes
                .contains("freeform_tags")
                .then(|| desired.freeform_tags.clone().unwrap_or_default()),
        };

        Ok(LogGroupUpdate {
            compartment_id: changes
                .contains("compartment_id")
                .then(|| desired.compartment_id.clone()),
            details: (!details.is_empty()).then_some(details),
        })
    }

    fn update_steps(&self, request: LogGroupUpdate) -> Vec<LogGroupUpdate> {
        request.into_steps()
    }

    fn apply_remote(&self, model: &mut LogGroupModel, remote: &LogGroup) {
        write_remote(model, remote);
    }

    fn remote_id(&self, remote: &LogGroup) -> String {
        remote.id.clone()
    }

    fn lifecycle_state(&self, remote: &LogGroup) -> String {
        remote.lifecycle_state.to_string()
    }

    async fn create(&self, request: CreateLogGroupDetails) -> Result<Submitted<LogGroup>> {
        let handle = self.client.create_log_group(request).await?;
        Ok(Submitted::work_request(handle))
    }

    async fn get(&self, id: &str) -> Result<LogGroup> {
        self.client.get_log_group(id).await
    }

    async fn update(&self, id: &str, request: LogGroupUpdate) -> Result<Submitted<LogGroup>> {
        let mut work_requests = Vec::new();
        if let Some(compartment_id) = &request.compartment_id {
            work_requests.push(
                self.client
                    .change_log_group_compartment(id, compartment_id)
                    .await?,
            );
        }
        if let Some(details) = request.details {
            work_requests.push(self.client.update_log_group(id, details).await?);
        }
        Ok(Submitted::Accepted {
            work_requests,
            resource: None,
        })
    }

    async fn delete(&self, id: &str) -> Result<Option<WorkRequestHandle>> {
        Ok(Some(self.client.delete_log_group(id).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{ListLogGroupsRequest, LogGroupLifecycleState};
    use chrono::Utc;
    use ocitf_core::ProviderError;
    use serde_json::json;

    struct Unused;

    #[async_trait]
    impl LoggingClient for Unused {
        async fn create_log_group(&self, _: CreateLogGroupDetails) -> Result<WorkRequestHandle> {
            unreachable!()
        }
        async fn get_log_group(&self, _: &str) -> Result<LogGroup> {
            unreachable!()
        }
        async fn update_log_group(&self, _: &str, _: UpdateLogGroupDetails) -> Result<WorkRequestHandle> {
            unreachable!()
        }
        async fn change_log_group_compartment(&self, _: &str, _: &str) -> Result<WorkRequestHandle> {
            unreachable!()
        }
        async fn delete_log_group(&self, _: &str) -> Result<WorkRequestHandle> {
            unreachable!()
        }
        async fn list_log_groups(
            &self,
            _: ListLogGroupsRequest,
        ) -> Result<ocitf_core::Page<LogGroup>> {
            unreachable!()
        }
    }

    #[async_trait]
    impl WorkRequestClient for Unused {
        async fn get_work_request(&self, _: &str) -> Result<ocitf_core::WorkRequest> {
            unreachable!()
        }
        async fn list_work_request_errors(
            &self,
            _: &str,
        ) -> Result<Vec<ocitf_core::WorkRequestError>> {
            unreachable!()
        }
    }

    fn resource() -> LogGroupResource {
        LogGroupResource::new(Arc::new(Unused), Arc::new(Unused)).unwrap()
    }

    fn model() -> LogGroupModel {
        LogGroupModel {
            compartment_id: "ocid1.compartment.oc1..c".to_string(),
            display_name: "displayName".to_string(),
            description: Some("app logs".to_string()),
            defined_tags: Some(BTreeMap::from([("Ops.Owner".to_string(), json!("team-a"))])),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_request_nests_defined_tags() {
        let request = resource().create_request(&model()).unwrap();
        assert_eq!(request.display_name, "displayName");
        assert_eq!(request.defined_tags.unwrap()["Ops"]["Owner"], json!("team-a"));
        assert!(request.freeform_tags.is_none());
    }

    #[test]
    fn test_create_request_rejects_bad_tag_key() {
        let mut bad = model();
        bad.defined_tags = Some(BTreeMap::from([("Owner".to_string(), json!("x"))]));
        assert!(matches!(
            resource().create_request(&bad),
            Err(ProviderError::Validation { .. })
        ));
    }

    #[test]
    fn test_update_request_sets_only_changed_fields() {
        let prior = model();
        let mut desired = model();
        desired.display_name = "displayName2".to_string();
        desired.compartment_id = "ocid1.compartment.oc1..d".to_string();

        let update = resource()
            .update_request(
                &prior,
                &desired,
                &ChangeSet::of(["display_name", "compartment_id"]),
            )
            .unwrap();

        assert_eq!(update.compartment_id.as_deref(), Some("ocid1.compartment.oc1..d"));
        let details = update.details.unwrap();
        assert_eq!(details.display_name.as_deref(), Some("displayName2"));
        assert!(details.description.is_none());
        assert!(details.defined_tags.is_none());
    }

    #[test]
    fn test_compartment_only_update_has_no_details() {
        let update = resource()
            .update_request(&model(), &model(), &ChangeSet::of(["compartment_id"]))
            .unwrap();
        assert!(update.details.is_none());
    }

    #[test]
    fn test_move_and_rename_are_separate_steps() {
        let update = LogGroupUpdate {
            compartment_id: Some("ocid1.compartment.oc1..d".to_string()),
            details: Some(UpdateLogGroupDetails {
                display_name: Some("displayName2".to_string()),
                ..Default::default()
            }),
        };

        let steps = resource().update_steps(update);
        assert_eq!(steps.len(), 2);
        assert!(steps[0].compartment_id.is_some() && steps[0].details.is_none());
        assert!(steps[1].compartment_id.is_none() && steps[1].details.is_some());
        assert!(resource().update_steps(LogGroupUpdate::default()).is_empty());
    }

    #[test]
    fn test_apply_remote_keeps_unreturned_optionals() {
        let now = Utc::now();
        let remote = LogGroup {
            id: "ocid1.loggroup.oc1..a".to_string(),
            compartment_id: "ocid1.compartment.oc1..c".to_string(),
            display_name: "displayName".to_string(),
            description: None,
            defined_tags: Default::default(),
            freeform_tags: Default::default(),
            lifecycle_state: LogGroupLifecycleState::Active,
            time_created: now,
            time_last_modified: now,
        };

        let mut state = model();
        resource().apply_remote(&mut state, &remote);
        assert_eq!(state.description.as_deref(), Some("app logs"));
        assert_eq!(state.state.as_deref(), Some("ACTIVE"));
        assert_eq!(state.time_created, Some(now.to_rfc3339()));
        assert_eq!(state.defined_tags, Some(BTreeMap::new()));
    }
}
