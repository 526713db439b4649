// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! `oci_logging_log_groups` data source.

use std::sync::Arc;

use async_trait::async_trait;
use ocitf_core::{
    AttributeSchema, AttributeType, DataSource, Filter, ProviderConfig, ResourceSpec, Result,
    RetryPolicy, apply_filters, paginate,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{ListLogGroupsRequest, LogGroupModel, LoggingClient};
use crate::hash_id;

/// Schema of `oci_logging_log_groups`.
pub fn log_groups_spec() -> ResourceSpec {
    ResourceSpec::new("oci_logging_log_groups", "logging")
        .attribute("compartment_id", AttributeSchema::required(AttributeType::String))
        .attribute("display_name", AttributeSchema::optional(AttributeType::String))
        .attribute(
            "is_compartment_id_in_subtree",
            AttributeSchema::optional(AttributeType::Bool),
        )
        .attribute("filter", AttributeSchema::optional(AttributeType::List))
        .attribute("log_groups", AttributeSchema::computed(AttributeType::List))
}

#[derive(Debug, Deserialize)]
struct Args {
    compartment_id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    is_compartment_id_in_subtree: Option<bool>,
    #[serde(default, rename = "filter")]
    filters: Vec<Filter>,
}

/// Lists log groups in a compartment.
pub struct LogGroupsDataSource {
    client: Arc<dyn LoggingClient>,
    retry: RetryPolicy,
    spec: ResourceSpec,
}

impl LogGroupsDataSource {
    pub fn new(client: Arc<dyn LoggingClient>, config: &ProviderConfig) -> Self {
        Self {
            client,
            retry: RetryPolicy::for_service("logging", false).configured(config),
            spec: log_groups_spec(),
        }
    }
}

#[async_trait]
impl DataSource for LogGroupsDataSource {
    fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    async fn read(&self, args: Value) -> Result<Value> {
        let args: Args = serde_json::from_value(args)?;
        let client = &self.client;
        let args_ref = &args;

        let log_groups = paginate(&self.retry, "list_log_groups", move |page| {
            client.list_log_groups(ListLogGroupsRequest {
                compartment_id: args_ref.compartment_id.clone(),
                display_name: args_ref.display_name.clone(),
                is_compartment_id_in_subtree: args_ref.is_compartment_id_in_subtree,
                page,
                limit: None,
            })
        })
        .await?;

        let items = log_groups
            .iter()
            .map(|lg| serde_json::to_value(LogGroupModel::from_remote(lg)))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let listed = items.len();
        let items = apply_filters(items, &args.filters)?;
        debug!(listed = listed, kept = items.len(), "Filtered log groups");

        Ok(json!({
            "id": hash_id(
                "LoggingLogGroupsDataSource",
                &[&args.compartment_id, args.display_name.as_deref().unwrap_or("")],
            ),
            "compartment_id": args.compartment_id,
            "display_name": args.display_name,
            "is_compartment_id_in_subtree": args.is_compartment_id_in_subtree,
            "filter": args.filters,
            "log_groups": items,
        }))
    }
}
