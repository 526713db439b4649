// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! `oci_streaming_streams` data source.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use ocitf_core::{
    AttributeSchema, AttributeType, DataSource, Filter, ProviderConfig, ProviderError,
    ResourceSpec, Result, RetryPolicy, apply_filters, paginate,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{ListStreamsRequest, StreamAdminClient, StreamLifecycleState, StreamModel};
use crate::hash_id;

/// Schema of `oci_streaming_streams`.
pub fn streams_spec() -> ResourceSpec {
    ResourceSpec::new("oci_streaming_streams", "streaming")
        .attribute("compartment_id", AttributeSchema::optional(AttributeType::String))
        .attribute("stream_pool_id", AttributeSchema::optional(AttributeType::String))
        .attribute(
            "id",
            AttributeSchema::optional_computed(AttributeType::String)
                .describe("Only the stream with this OCID; the result's own id is a hash of the query"),
        )
        .attribute("name", AttributeSchema::optional(AttributeType::String))
        .attribute("state", AttributeSchema::optional(AttributeType::String))
        .attribute("filter", AttributeSchema::optional(AttributeType::List))
        .attribute("streams", AttributeSchema::computed(AttributeType::List))
}

#[derive(Debug, Default, Deserialize)]
struct Args {
    #[serde(default)]
    compartment_id: Option<String>,
    #[serde(default)]
    stream_pool_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default, rename = "filter")]
    filters: Vec<Filter>,
}

/// Lists streams of a compartment or a stream pool.
pub struct StreamsDataSource {
    client: Arc<dyn StreamAdminClient>,
    retry: RetryPolicy,
    spec: ResourceSpec,
}

impl StreamsDataSource {
    pub fn new(client: Arc<dyn StreamAdminClient>, config: &ProviderConfig) -> Self {
        Self {
            client,
            retry: RetryPolicy::for_service("streaming", false).configured(config),
            spec: streams_spec(),
        }
    }
}

#[async_trait]
impl DataSource for StreamsDataSource {
    fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    async fn read(&self, args: Value) -> Result<Value> {
        let args: Args = serde_json::from_value(args)?;
        if args.compartment_id.is_none() && args.stream_pool_id.is_none() {
            return Err(ProviderError::validation(
                "compartment_id",
                "one of compartment_id or stream_pool_id must be set",
            ));
        }
        let lifecycle_state = args
            .state
            .as_deref()
            .map(StreamLifecycleState::from_str)
            .transpose()
            .map_err(|e| ProviderError::validation("state", e.to_string()))?;

        let client = &self.client;
        let args_ref = &args;
        let streams = paginate(&self.retry, "list_streams", move |page| {
            client.list_streams(ListStreamsRequest {
                compartment_id: args_ref.compartment_id.clone(),
                stream_pool_id: args_ref.stream_pool_id.clone(),
                id: args_ref.id.clone(),
                name: args_ref.name.clone(),
                lifecycle_state,
                page,
                limit: None,
            })
        })
        .await?;

        let items = streams
            .iter()
            .map(|s| serde_json::to_value(StreamModel::from_remote(s)))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let listed = items.len();
        let items = apply_filters(items, &args.filters)?;
        debug!(listed = listed, kept = items.len(), "Filtered streams");

        Ok(json!({
            "id": hash_id(
                "StreamingStreamsDataSource",
                &[
                    args.compartment_id.as_deref().unwrap_or(""),
                    args.stream_pool_id.as_deref().unwrap_or(""),
                    args.id.as_deref().unwrap_or(""),
                    args.name.as_deref().unwrap_or(""),
                    args.state.as_deref().unwrap_or(""),
                ],
            ),
            "compartment_id": args.compartment_id,
            "stream_pool_id": args.stream_pool_id,
            "name": args.name,
            "state": args.state,
            "filter": args.filters,
            "streams": items,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::{CreateStreamDetails, Stream, UpdateStreamDetails};
    use chrono::Utc;
    use ocitf_core::Page;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct Listing {
        pages: Vec<Page<Stream>>,
        requests: Mutex<Vec<ListStreamsRequest>>,
    }

    fn stream(id: &str, name: &str, state: StreamLifecycleState) -> Stream {
        Stream {
            id: id.to_string(),
            name: name.to_string(),
            compartment_id: "ocid1.compartment.oc1..c".to_string(),
            stream_pool_id: "ocid1.streampool.oc1..p".to_string(),
            partitions: 1,
            retention_in_hours: 24,
            messages_endpoint: "https://cell-1.streaming.example".to_string(),
            lifecycle_state: state,
            lifecycle_state_details: None,
            defined_tags: BTreeMap::new(),
            freeform_tags: BTreeMap::new(),
            time_created: Utc::now(),
        }
    }

    #[async_trait]
    impl StreamAdminClient for Listing {
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
        async fn list_streams(&self, request: ListStreamsRequest) -> Result<Page<Stream>> {
            let index = match request.page.as_deref() {
                None => 0,
                Some(token) => token.parse::<usize>().unwrap_or(0),
            };
            self.requests.lock().unwrap().push(request);
            Ok(self.pages[index].clone())
        }
    }

    fn listing() -> Arc<Listing> {
        Arc::new(Listing {
            pages: vec![
                Page {
                    items: vec![stream("s1", "orders", StreamLifecycleState::Active)],
                    next_page: Some("1".to_string()),
                },
                Page::last(vec![
                    stream("s2", "payments", StreamLifecycleState::Active),
                    stream("s3", "orders-dlq", StreamLifecycleState::Active),
                ]),
            ],
            requests: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_lists_all_pages_and_filters() {
        let client = listing();
        let source = StreamsDataSource::new(client.clone(), &ProviderConfig::default());

        let out = source
            .read(json!({
                "compartment_id": "ocid1.compartment.oc1..c",
                "state": "ACTIVE",
                "filter": [{"name": "name", "values": ["^orders"], "regex": true}],
            }))
            .await
            .unwrap();

        let names: Vec<&str> = out["streams"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["orders", "orders-dlq"]);

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].lifecycle_state, Some(StreamLifecycleState::Active));
        assert!(out["id"].as_str().unwrap().starts_with("StreamingStreamsDataSource-"));
    }

    #[tokio::test]
    async fn test_requires_compartment_or_pool() {
        let source = StreamsDataSource::new(listing(), &ProviderConfig::default());
        let err = source.read(json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_rejects_unknown_state() {
        let source = StreamsDataSource::new(listing(), &ProviderConfig::default());
        let err = source
            .read(json!({"compartment_id": "c", "state": "SLEEPING"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation { ref attribute, .. } if attribute == "state"));
    }
}
