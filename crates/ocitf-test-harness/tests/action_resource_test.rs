// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wallet download action resource through the registry.

mod common;

use common::*;
use ocitf_core::{Plan, ProviderError};
use ocitf_provider::opsi::WALLET_DOWNLOAD_TYPE;
use ocitf_test_harness::FakeOci;
use serde_json::json;

const WAREHOUSE: &str = "ocid1.opsiwarehouse.oc1..w";

fn inputs(password: &str) -> ocitf_core::ResourceState {
    state(json!({
        "operations_insights_warehouse_id": WAREHOUSE,
        "operations_insights_warehouse_wallet_password": password,
    }))
}

#[tokio::test(start_paused = true)]
async fn test_create_downloads_once() {
    let (fake, registry) = setup(FakeOci::new());
    let handler = registry.resource(WALLET_DOWNLOAD_TYPE).unwrap();

    let created = handler.create(inputs("Secret#1")).await.unwrap();

    assert!(!str_attr(&created, "wallet").is_empty());
    assert!(str_attr(&created, "id").starts_with("OpsiWarehouseWallet-"));
    assert_eq!(
        fake.calls("download_operations_insights_warehouse_wallet").await,
        1
    );

    // Read and delete never call the service.
    let read = handler.read(created.clone()).await.unwrap();
    assert_eq!(read.as_ref(), Some(&created));
    handler.delete(created).await.unwrap();
    assert_eq!(
        fake.calls("download_operations_insights_warehouse_wallet").await,
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_same_inputs_give_same_id() {
    let (_, registry) = setup(FakeOci::new());
    let handler = registry.resource(WALLET_DOWNLOAD_TYPE).unwrap();

    let first = handler.create(inputs("Secret#1")).await.unwrap();
    let second = handler.create(inputs("Secret#1")).await.unwrap();

    assert_eq!(first.id(), second.id());
}

#[tokio::test(start_paused = true)]
async fn test_changed_password_forces_replacement() {
    let (fake, registry) = setup(FakeOci::new());
    let handler = registry.resource(WALLET_DOWNLOAD_TYPE).unwrap();
    let created = handler.create(inputs("Secret#1")).await.unwrap();

    let mut desired = created.clone();
    desired.set(
        "operations_insights_warehouse_wallet_password",
        json!("Secret#2"),
    );

    assert!(matches!(
        handler.plan(Some(&created), Some(&desired)).unwrap(),
        Plan::Replace { .. }
    ));
    let err = handler.update(created.clone(), desired.clone()).await.unwrap_err();
    assert!(matches!(err, ProviderError::ForceNewChange { .. }));

    let replaced = handler
        .apply(Some(created), Some(desired))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        str_attr(&replaced, "operations_insights_warehouse_wallet_password"),
        "Secret#2"
    );
    assert_eq!(
        fake.calls("download_operations_insights_warehouse_wallet").await,
        2
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_password_is_rejected() {
    let (fake, registry) = setup(FakeOci::new());

    let err = registry
        .resource(WALLET_DOWNLOAD_TYPE)
        .unwrap()
        .create(inputs(""))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Validation { .. }));
    assert_eq!(
        fake.calls("download_operations_insights_warehouse_wallet").await,
        0
    );
}

#[tokio::test(start_paused = true)]
async fn test_import_is_not_supported() {
    let (_, registry) = setup(FakeOci::new());
    let result = registry
        .resource(WALLET_DOWNLOAD_TYPE)
        .unwrap()
        .import("anything")
        .await;
    assert!(result.is_err());
}
