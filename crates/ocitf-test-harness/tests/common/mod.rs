// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared setup for ocitf integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use ocitf_core::{ProviderConfig, ProviderRegistry, ResourceState};
use ocitf_provider::build_registry;
use ocitf_test_harness::FakeOci;
use serde_json::Value;

pub const COMPARTMENT: &str = "ocid1.compartment.oc1..tests";
pub const OTHER_COMPARTMENT: &str = "ocid1.compartment.oc1..other";

/// A fake plus a registry wired to it.
pub fn setup(fake: FakeOci) -> (Arc<FakeOci>, ProviderRegistry) {
    let (fake, clients) = fake.into_clients();
    let registry = build_registry(&clients, &ProviderConfig::default())
        .expect("registry builds");
    (fake, registry)
}

/// State from a JSON object literal.
pub fn state(value: Value) -> ResourceState {
    serde_json::from_value(value).expect("state is a JSON object")
}

pub fn str_attr<'a>(state: &'a ResourceState, name: &str) -> &'a str {
    state
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_else(|| panic!("{} is not a string in {:?}", name, state))
}
