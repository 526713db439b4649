// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! OCI Streaming service: streams.
//!
//! Stream calls are synchronous from the API's point of view; the stream
//! then moves through its lifecycle states and is polled until it settles.

mod stream;
mod streams;

pub use stream::{StreamModel, StreamResource, StreamUpdate, stream_spec};
pub use streams::{StreamsDataSource, streams_spec};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ocitf_core::mapping::{DefinedTags, FreeformTags};
use ocitf_core::{Page, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle state of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamLifecycleState {
    Creating,
    Active,
    Deleting,
    Deleted,
    Failed,
    Updating,
}

/// A stream as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    pub name: String,
    pub compartment_id: String,
    pub stream_pool_id: String,
    pub partitions: i32,
    pub retention_in_hours: i32,
    /// Endpoint for producing and consuming messages.
    pub messages_endpoint: String,
    pub lifecycle_state: StreamLifecycleState,
    /// Reason for a FAILED state, when the service gives one.
    pub lifecycle_state_details: Option<String>,
    pub defined_tags: DefinedTags,
    pub freeform_tags: FreeformTags,
    pub time_created: DateTime<Utc>,
}

/// Payload of `CreateStream`. Exactly one of `compartment_id` and
/// `stream_pool_id` is expected; without a pool the default pool of the
/// compartment is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateStreamDetails {
    pub name: String,
    pub partitions: i32,
    pub compartment_id: Option<String>,
    pub stream_pool_id: Option<String>,
    pub retention_in_hours: Option<i32>,
    pub defined_tags: Option<DefinedTags>,
    pub freeform_tags: Option<FreeformTags>,
}

/// Payload of `UpdateStream`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateStreamDetails {
    pub defined_tags: Option<DefinedTags>,
    pub freeform_tags: Option<FreeformTags>,
}

impl UpdateStreamDetails {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Query of `ListStreams`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListStreamsRequest {
    pub compartment_id: Option<String>,
    pub stream_pool_id: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub lifecycle_state: Option<StreamLifecycleState>,
    pub page: Option<String>,
    pub limit: Option<u32>,
}

/// Stream endpoints of the Streaming admin API.
#[async_trait]
pub trait StreamAdminClient: Send + Sync {
    async fn create_stream(&self, details: CreateStreamDetails) -> Result<Stream>;

    async fn get_stream(&self, id: &str) -> Result<Stream>;

    async fn update_stream(&self, id: &str, details: UpdateStreamDetails) -> Result<Stream>;

    async fn change_stream_compartment(&self, id: &str, compartment_id: &str) -> Result<()>;

    async fn delete_stream(&self, id: &str) -> Result<()>;

    async fn list_streams(&self, request: ListStreamsRequest) -> Result<Page<Stream>>;
}
