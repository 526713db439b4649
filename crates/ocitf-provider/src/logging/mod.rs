// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! OCI Logging service: log groups.
//!
//! Every mutating log group call is asynchronous and returns a work request
//! id; the log group itself is read back once the work request succeeds.

mod log_group;
mod log_groups;

pub use log_group::{LogGroupModel, LogGroupResource, LogGroupUpdate, log_group_spec};
pub use log_groups::{LogGroupsDataSource, log_groups_spec};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ocitf_core::mapping::{DefinedTags, FreeformTags};
use ocitf_core::{Page, Result, WorkRequestHandle};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Entity type the Logging service reports in work requests.
pub const LOG_GROUP_ENTITY_TYPE: &str = "loggroup";

/// Lifecycle state of a log group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogGroupLifecycleState {
    Creating,
    Active,
    Updating,
    Inactive,
    Deleting,
    Failed,
}

/// A log group as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogGroup {
    pub id: String,
    pub compartment_id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub defined_tags: DefinedTags,
    pub freeform_tags: FreeformTags,
    pub lifecycle_state: LogGroupLifecycleState,
    pub time_created: DateTime<Utc>,
    pub time_last_modified: DateTime<Utc>,
}

/// Payload of `CreateLogGroup`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateLogGroupDetails {
    pub compartment_id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub defined_tags: Option<DefinedTags>,
    pub freeform_tags: Option<FreeformTags>,
}

/// Payload of `UpdateLogGroup`; unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateLogGroupDetails {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub defined_tags: Option<DefinedTags>,
    pub freeform_tags: Option<FreeformTags>,
}

impl UpdateLogGroupDetails {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Query of `ListLogGroups`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListLogGroupsRequest {
    pub compartment_id: String,
    pub display_name: Option<String>,
    pub is_compartment_id_in_subtree: Option<bool>,
    pub page: Option<String>,
    pub limit: Option<u32>,
}

/// Log group endpoints of the Logging management API.
#[async_trait]
pub trait LoggingClient: Send + Sync {
    async fn create_log_group(&self, details: CreateLogGroupDetails) -> Result<WorkRequestHandle>;

    async fn get_log_group(&self, id: &str) -> Result<LogGroup>;

    async fn update_log_group(
        &self,
        id: &str,
        details: UpdateLogGroupDetails,
    ) -> Result<WorkRequestHandle>;

    async fn change_log_group_compartment(
        &self,
        id: &str,
        compartment_id: &str,
    ) -> Result<WorkRequestHandle>;

    async fn delete_log_group(&self, id: &str) -> Result<WorkRequestHandle>;

    async fn list_log_groups(&self, request: ListLogGroupsRequest) -> Result<Page<LogGroup>>;
}
