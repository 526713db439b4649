// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Operations Insights: warehouse wallet download.
//!
//! The download is an action, not a managed object. Creating the resource
//! fetches the wallet once and records it base64-encoded in state; changing
//! the warehouse or the password downloads it again.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use ocitf_core::{
    ActionResource, AttributeSchema, AttributeType, ProviderConfig, ProviderError, ResourceModel,
    ResourceSpec, Result, RetryPolicy,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hash_id;

pub const WALLET_DOWNLOAD_TYPE: &str =
    "oci_opsi_operations_insights_warehouse_download_warehouse_wallet";

/// Operations Insights warehouse endpoints.
#[async_trait]
pub trait OpsiClient: Send + Sync {
    /// Raw wallet archive of a warehouse, protected by `password`.
    async fn download_operations_insights_warehouse_wallet(
        &self,
        warehouse_id: &str,
        password: &str,
    ) -> Result<Vec<u8>>;
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarehouseWalletModel {
    #[serde(default)]
    pub id: Option<String>,
    pub operations_insights_warehouse_id: String,
    pub operations_insights_warehouse_wallet_password: String,
    /// Wallet archive, base64.
    #[serde(default)]
    pub wallet: Option<String>,
}

impl fmt::Debug for WarehouseWalletModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseWalletModel")
            .field("id", &self.id)
            .field(
                "operations_insights_warehouse_id",
                &self.operations_insights_warehouse_id,
            )
            .field("operations_insights_warehouse_wallet_password", &"<redacted>")
            .field("wallet", &self.wallet.as_ref().map(|w| w.len()))
            .finish()
    }
}

impl ResourceModel for WarehouseWalletModel {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }
}

/// Schema of the wallet download action.
pub fn warehouse_wallet_spec() -> ResourceSpec {
    ResourceSpec::new(WALLET_DOWNLOAD_TYPE, "opsi")
        .attribute(
            "operations_insights_warehouse_id",
            AttributeSchema::required(AttributeType::String),
        )
        .attribute(
            "operations_insights_warehouse_wallet_password",
            AttributeSchema::required(AttributeType::String).sensitive(),
        )
        .attribute(
            "wallet",
            AttributeSchema::computed(AttributeType::String)
                .sensitive()
                .describe("Wallet archive, base64 encoded"),
        )
}

pub struct WarehouseWalletDownload {
    client: Arc<dyn OpsiClient>,
    retry: RetryPolicy,
    spec: ResourceSpec,
}

impl WarehouseWalletDownload {
    pub fn new(client: Arc<dyn OpsiClient>, config: &ProviderConfig) -> Self {
        Self {
            client,
            retry: RetryPolicy::for_service("opsi", false).configured(config),
            spec: warehouse_wallet_spec(),
        }
    }
}

#[async_trait]
impl ActionResource for WarehouseWalletDownload {
    type Model = WarehouseWalletModel;

    fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    fn derive_id(&self, model: &WarehouseWalletModel) -> String {
        hash_id(
            "OpsiWarehouseWallet",
            &[model.operations_insights_warehouse_id.as_str()],
        )
    }

    async fn execute(&self, model: &WarehouseWalletModel) -> Result<WarehouseWalletModel> {
        if model.operations_insights_warehouse_wallet_password.is_empty() {
            return Err(ProviderError::validation(
                "operations_insights_warehouse_wallet_password",
                "must not be empty",
            ));
        }

        let client = &self.client;
        let warehouse_id = model.operations_insights_warehouse_id.as_str();
        let password = model.operations_insights_warehouse_wallet_password.as_str();
        let bytes = self
            .retry
            .execute("download_warehouse_wallet", move || {
                client.download_operations_insights_warehouse_wallet(warehouse_id, password)
            })
            .await?;
        debug!(warehouse_id, size = bytes.len(), "Downloaded warehouse wallet");

        let mut executed = model.clone();
        executed.wallet = Some(general_purpose::STANDARD.encode(&bytes));
        Ok(executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocitf_core::{ActionOrchestrator, Plan, ServiceError};
    use std::sync::Mutex;

    struct Wallets {
        calls: Mutex<u32>,
        throttle_first: bool,
    }

    #[async_trait]
    impl OpsiClient for Wallets {
        async fn download_operations_insights_warehouse_wallet(
            &self,
            warehouse_id: &str,
            password: &str,
        ) -> Result<Vec<u8>> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if self.throttle_first && *calls == 1 {
                return Err(ProviderError::Service(ServiceError::new(
                    429,
                    "TooManyRequests",
                    "slow down",
                )));
            }
            Ok(format!("{}:{}", warehouse_id, password).into_bytes())
        }
    }

    fn model() -> WarehouseWalletModel {
        WarehouseWalletModel {
            operations_insights_warehouse_id: "ocid1.opsiwarehouse.oc1..w".to_string(),
            operations_insights_warehouse_wallet_password: "s3cret".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_records_base64_wallet() {
        let client = Arc::new(Wallets {
            calls: Mutex::new(0),
            throttle_first: true,
        });
        let action = ActionOrchestrator::new(WarehouseWalletDownload::new(
            client.clone(),
            &ProviderConfig::default(),
        ));

        let created = action.create(&model()).await.unwrap();
        let decoded = general_purpose::STANDARD
            .decode(created.wallet.as_deref().unwrap())
            .unwrap();
        assert_eq!(decoded, b"ocid1.opsiwarehouse.oc1..w:s3cret");
        assert!(created.id.as_deref().unwrap().starts_with("OpsiWarehouseWallet-"));
        assert_eq!(*client.calls.lock().unwrap(), 2);
    }

    #[test]
    fn test_password_change_replaces() {
        let client = Arc::new(Wallets {
            calls: Mutex::new(0),
            throttle_first: false,
        });
        let action =
            ActionOrchestrator::new(WarehouseWalletDownload::new(client, &ProviderConfig::default()));
        let mut prior = model();
        prior.id = Some("OpsiWarehouseWallet-x".to_string());
        let mut desired = prior.clone();
        desired.operations_insights_warehouse_wallet_password = "rotated".to_string();

        let plan = action.plan(Some(&prior), Some(&desired)).unwrap();
        assert!(matches!(plan, Plan::Replace { .. }));
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", model());
        assert!(!rendered.contains("s3cret"));
    }
}
