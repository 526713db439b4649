// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! `oci_streaming_stream`

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ocitf_core::mapping::{defined_tags_from_response, optional_defined_tags};
use ocitf_core::{
    AttributeSchema, AttributeType, ChangeSet, LifecycleStateSet, ProviderError, Resource,
    ResourceLifecycle, ResourceModel, ResourceSpec, Result, Submitted, WorkRequestHandle,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CreateStreamDetails, Stream, StreamAdminClient, UpdateStreamDetails};

const MIN_RETENTION_HOURS: i64 = 24;
const MAX_RETENTION_HOURS: i64 = 168;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub partitions: i64,
    #[serde(default)]
    pub compartment_id: Option<String>,
    #[serde(default)]
    pub stream_pool_id: Option<String>,
    #[serde(default)]
    pub retention_in_hours: Option<i64>,
    #[serde(default)]
    pub defined_tags: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub freeform_tags: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub messages_endpoint: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub lifecycle_state_details: Option<String>,
    #[serde(default)]
    pub time_created: Option<String>,
}

impl ResourceModel for StreamModel {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }
}

impl StreamModel {
    pub fn from_remote(remote: &Stream) -> Self {
        let mut model = Self {
            id: Some(remote.id.clone()),
            ..Default::default()
        };
        write_remote(&mut model, remote);
        model
    }
}

fn write_remote(model: &mut StreamModel, remote: &Stream) {
    model.name = remote.name.clone();
    model.partitions = i64::from(remote.partitions);
    model.compartment_id = Some(remote.compartment_id.clone());
    model.stream_pool_id = Some(remote.stream_pool_id.clone());
    model.retention_in_hours = Some(i64::from(remote.retention_in_hours));
    model.defined_tags = Some(defined_tags_from_response(&remote.defined_tags));
    model.freeform_tags = Some(remote.freeform_tags.clone());
    model.messages_endpoint = Some(remote.messages_endpoint.clone());
    model.state = Some(remote.lifecycle_state.to_string());
    if let Some(details) = &remote.lifecycle_state_details {
        model.lifecycle_state_details = Some(details.clone());
    }
    model.time_created = Some(remote.time_created.to_rfc3339());
}

/// Schema of `oci_streaming_stream`.
pub fn stream_spec() -> ResourceSpec {
    ResourceSpec::new("oci_streaming_stream", "streaming")
        .attribute(
            "name",
            AttributeSchema::required(AttributeType::String).force_new(),
        )
        .attribute(
            "partitions",
            AttributeSchema::required(AttributeType::Int)
                .force_new()
                .describe("Number of partitions; cannot be changed after creation"),
        )
        .attribute(
            "compartment_id",
            AttributeSchema::optional_computed(AttributeType::String)
                .describe("Defaults to the compartment of the stream pool"),
        )
        .attribute(
            "stream_pool_id",
            AttributeSchema::optional_computed(AttributeType::String)
                .force_new()
                .describe("Defaults to the compartment's default pool"),
        )
        .attribute(
            "retention_in_hours",
            AttributeSchema::optional_computed(AttributeType::Int)
                .force_new()
                .describe("Between 24 and 168 hours; 24 when unset"),
        )
        .attribute("defined_tags", AttributeSchema::optional_computed(AttributeType::Map))
        .attribute("freeform_tags", AttributeSchema::optional_computed(AttributeType::Map))
        .attribute("messages_endpoint", AttributeSchema::computed(AttributeType::String))
        .attribute("state", AttributeSchema::computed(AttributeType::String))
        .attribute(
            "lifecycle_state_details",
            AttributeSchema::computed(AttributeType::String),
        )
        .attribute("time_created", AttributeSchema::computed(AttributeType::String))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamUpdate {
    pub compartment_id: Option<String>,
    pub details: Option<UpdateStreamDetails>,
}

impl StreamUpdate {
    /// Compartment move first, tag update second; each settles on its own.
    pub fn into_steps(self) -> Vec<StreamUpdate> {
        let mut steps = Vec::new();
        if let Some(compartment_id) = self.compartment_id {
            steps.push(StreamUpdate {
                compartment_id: Some(compartment_id),
                details: None,
            });
        }
        if let Some(details) = self.details {
            steps.push(StreamUpdate {
                compartment_id: None,
                details: Some(details),
            });
        }
        steps
    }
}

/// Stream resource; converges by polling the stream's lifecycle state.
pub struct StreamResource {
    client: Arc<dyn StreamAdminClient>,
    spec: ResourceSpec,
    lifecycle: ResourceLifecycle,
}

impl StreamResource {
    pub fn new(client: Arc<dyn StreamAdminClient>) -> Result<Self> {
        let lifecycle = ResourceLifecycle::none()
            .with_create(LifecycleStateSet::new(&["CREATING"], &["ACTIVE"])?)
            .with_update(LifecycleStateSet::new(&["UPDATING"], &["ACTIVE"])?)
            .with_delete(
                LifecycleStateSet::new(&["DELETING"], &["DELETED"])?.with_not_found_as_target(),
            );
        Ok(Self {
            client,
            spec: stream_spec(),
            lifecycle,
        })
    }
}

fn to_i32(attribute: &str, value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| ProviderError::validation(attribute, "value out of range"))
}

#[async_trait]
impl Resource for StreamResource {
    type Model = StreamModel;
    type Remote = Stream;
    type CreateRequest = CreateStreamDetails;
    type UpdateRequest = StreamUpdate;

    fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    fn lifecycle(&self) -> &ResourceLifecycle {
        &self.lifecycle
    }

    fn create_request(&self, model: &StreamModel) -> Result<CreateStreamDetails> {
        if model.compartment_id.is_none() && model.stream_pool_id.is_none() {
            return Err(ProviderError::validation(
                "compartment_id",
                "one of compartment_id or stream_pool_id must be set",
            ));
        }
        if model.partitions < 1 {
            return Err(ProviderError::validation(
                "partitions",
                "must be at least 1",
            ));
        }
        if let Some(hours) = model.retention_in_hours
            && !(MIN_RETENTION_HOURS..=MAX_RETENTION_HOURS).contains(&hours)
        {
            return Err(ProviderError::validation(
                "retention_in_hours",
                format!(
                    "must be between {} and {}",
                    MIN_RETENTION_HOURS, MAX_RETENTION_HOURS
                ),
            ));
        }

        Ok(CreateStreamDetails {
            name: model.name.clone(),
            partitions: to_i32("partitions", model.partitions)?,
            compartment_id: model.compartment_id.clone(),
            stream_pool_id: model.stream_pool_id.clone(),
            retention_in_hours: model
                .retention_in_hours
                .map(|h| to_i32("retention_in_hours", h))
                .transpose()?,
            defined_tags: optional_defined_tags(model.defined_tags.as_ref())?,
            freeform_tags: model.freeform_tags.clone(),
        })
    }

    fn update_request(
        &self,
        _prior: &StreamModel,
        desired: &StreamModel,
        changes: &ChangeSet,
    ) -> Result<StreamUpdate> {
        let details = UpdateStreamDetails {
            defined_tags: if changes.contains("defined_tags") {
                Some(optional_defined_tags(desired.defined_tags.as_ref())?.unwrap_or_default())
            } else {
                None
            },
            freeform_tags: changes
                .contains("freeform_tags")
                .then(|| desired.freeform_tags.clone().unwrap_or_default()),
        };

        Ok(StreamUpdate {
            compartment_id: if changes.contains("compartment_id") {
                desired.compartment_id.clone()
            } else {
                None
            },
            details: (!details.is_empty()).then_some(details),
        })
    }

    fn update_steps(&self, request: StreamUpdate) -> Vec<StreamUpdate> {
        request.into_steps()
    }

    fn apply_remote(&self, model: &mut StreamModel, remote: &Stream) {
        write_remote(model, remote);
    }

    fn remote_id(&self, remote: &Stream) -> String {
        remote.id.clone()
    }

    fn lifecycle_state(&self, remote: &Stream) -> String {
        remote.lifecycle_state.to_string()
    }

    async fn create(&self, request: CreateStreamDetails) -> Result<Submitted<Stream>> {
        Ok(Submitted::Done(self.client.create_stream(request).await?))
    }

    async fn get(&self, id: &str) -> Result<Stream> {
        self.client.get_stream(id).await
    }

    async fn update(&self, id: &str, request: StreamUpdate) -> Result<Submitted<Stream>> {
        if let Some(compartment_id) = &request.compartment_id {
            self.client
                .change_stream_compartment(id, compartment_id)
                .await?;
        }
        let stream = match request.details {
            Some(details) => self.client.update_stream(id, details).await?,
            None => self.client.get_stream(id).await?,
        };
        Ok(Submitted::Done(stream))
    }

    async fn delete(&self, id: &str) -> Result<Option<WorkRequestHandle>> {
        self.client.delete_stream(id).await?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::ListStreamsRequest;
    use ocitf_core::Page;

    struct Unused;

    #[async_trait]
    impl StreamAdminClient for Unused {
        async fn create_stream(&self, _: CreateStreamDetails) -> Result<Stream> {
            unreachable!()
        }
        async fn get_stream(&self, _: &str) -> Result<Stream> {
            unreachable!()
        }
        async fn update_stream(&self, _: &str, _: UpdateStreamDetails) -> Result<Stream> {
            unreachable!()
        }
        async fn change_stream_compartment(&self, _: &str, _: &str) -> Result<()> {
            unreachable!()
        }
        async fn delete_stream(&self, _: &str) -> Result<()> {
            unreachable!()
        }
        async fn list_streams(&self, _: ListStreamsRequest) -> Result<Page<Stream>> {
            unreachable!()
        }
    }

    fn resource() -> StreamResource {
        StreamResource::new(Arc::new(Unused)).unwrap()
    }

    fn model() -> StreamModel {
        StreamModel {
            name: "orders".to_string(),
            partitions: 2,
            compartment_id: Some("ocid1.compartment.oc1..c".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_requires_compartment_or_pool() {
        let mut orphan = model();
        orphan.compartment_id = None;
        assert!(matches!(
            resource().create_request(&orphan),
            Err(ProviderError::Validation { ref attribute, .. }) if attribute == "compartment_id"
        ));

        orphan.stream_pool_id = Some("ocid1.streampool.oc1..p".to_string());
        assert!(resource().create_request(&orphan).is_ok());
    }

    #[test]
    fn test_create_validates_ranges() {
        let mut bad = model();
        bad.partitions = 0;
        assert!(resource().create_request(&bad).is_err());

        let mut bad = model();
        bad.retention_in_hours = Some(200);
        assert!(resource().create_request(&bad).is_err());

        let mut ok = model();
        ok.retention_in_hours = Some(48);
        assert_eq!(resource().create_request(&ok).unwrap().retention_in_hours, Some(48));
    }

    #[test]
    fn test_force_new_attributes() {
        let spec = stream_spec();
        assert_eq!(
            spec.force_new_attributes(),
            vec!["name", "partitions", "retention_in_hours", "stream_pool_id"]
        );
    }

    #[test]
    fn test_tag_only_update() {
        let mut desired = model();
        desired.freeform_tags = Some(BTreeMap::from([("team".to_string(), "core".to_string())]));
        let update = resource()
            .update_request(&model(), &desired, &ChangeSet::of(["freeform_tags"]))
            .unwrap();
        assert!(update.compartment_id.is_none());
        assert_eq!(
            update.details.unwrap().freeform_tags.unwrap()["team"],
            "core"
        );
    }
}
