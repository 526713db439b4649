// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wiring of every resource type and data source into a registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use ocitf_core::{
    ActionOrchestrator, ProviderConfig, ProviderRegistry, ProviderSchema, ResourceOrchestrator,
    Result, WorkRequestClient,
};
use tracing::info;

use crate::logging::{
    LogGroupResource, LogGroupsDataSource, LoggingClient, log_group_spec, log_groups_spec,
};
use crate::opsi::{OpsiClient, WarehouseWalletDownload, warehouse_wallet_spec};
use crate::streaming::{
    StreamAdminClient, StreamResource, StreamsDataSource, stream_spec, streams_spec,
};

/// Service clients the provider's resources talk to.
#[derive(Clone)]
pub struct ServiceClients {
    pub logging: Arc<dyn LoggingClient>,
    /// Work requests of the Logging service.
    pub logging_work_requests: Arc<dyn WorkRequestClient>,
    pub streaming: Arc<dyn StreamAdminClient>,
    pub opsi: Arc<dyn OpsiClient>,
}

/// Build the provider registry. Called once at startup; the returned
/// registry is passed by reference to whatever drives the resources.
pub fn build_registry(clients: &ServiceClients, config: &ProviderConfig) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    registry.register_resource(ResourceOrchestrator::new(
        LogGroupResource::new(clients.logging.clone(), clients.logging_work_requests.clone())?,
        config,
    ))?;
    registry.register_resource(ResourceOrchestrator::new(
        StreamResource::new(clients.streaming.clone())?,
        config,
    ))?;
    registry.register_resource(ActionOrchestrator::new(WarehouseWalletDownload::new(
        clients.opsi.clone(),
        config,
    )))?;

    registry.register_data_source(LogGroupsDataSource::new(clients.logging.clone(), config))?;
    registry.register_data_source(StreamsDataSource::new(clients.streaming.clone(), config))?;

    info!(
        resources = registry.resource_names().len(),
        data_sources = registry.data_source_names().len(),
        "Provider registry built"
    );
    Ok(registry)
}

/// Schemas of every type the provider exposes, without any clients.
pub fn provider_schema() -> ProviderSchema {
    let resources = [
        log_group_spec(),
        stream_spec(),
        ActionOrchestrator::<WarehouseWalletDownload>::effective_spec(&warehouse_wallet_spec()),
    ];
    let data_sources = [log_groups_spec(), streams_spec()];

    ProviderSchema {
        resources: resources
            .into_iter()
            .map(|spec| (spec.type_name.clone(), spec))
            .collect::<BTreeMap<_, _>>(),
        data_sources: data_sources
            .into_iter()
            .map(|spec| (spec.type_name.clone(), spec))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opsi::WALLET_DOWNLOAD_TYPE;

    #[test]
    fn test_provider_schema_lists_every_type() {
        let schema = provider_schema();
        assert_eq!(
            schema.resources.keys().map(String::as_str).collect::<Vec<_>>(),
            vec![
                "oci_logging_log_group",
                WALLET_DOWNLOAD_TYPE,
                "oci_streaming_stream",
            ]
        );
        assert_eq!(
            schema.data_sources.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["oci_logging_log_groups", "oci_streaming_streams"]
        );
        assert!(
            schema.resources[WALLET_DOWNLOAD_TYPE].attributes["operations_insights_warehouse_id"]
                .force_new
        );
    }
}
