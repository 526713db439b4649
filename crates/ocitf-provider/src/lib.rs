// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! ocitf Provider - OCI resource types
//!
//! Concrete resource types and data sources built on `ocitf-core`. Each
//! service module declares an async client trait modelling the service API,
//! the request/response mapping for its resources, and the
//! [`Resource`](ocitf_core::Resource) or
//! [`ActionResource`](ocitf_core::ActionResource) implementation that the
//! core orchestrators drive.
//!
//! | Type name | Kind | Converges via |
//! |-----------|------|---------------|
//! | `oci_logging_log_group` | resource | work requests |
//! | `oci_streaming_stream` | resource | lifecycle polling |
//! | `oci_opsi_operations_insights_warehouse_download_warehouse_wallet` | action | n/a |
//! | `oci_logging_log_groups` | data source | pagination + filters |
//! | `oci_streaming_streams` | data source | pagination + filters |
//!
//! The HTTP transport and request signing are not part of this crate;
//! callers supply client implementations through [`ServiceClients`].

pub mod logging;
pub mod opsi;
pub mod streaming;

mod registry;

pub use registry::{ServiceClients, build_registry, provider_schema};

use sha2::{Digest, Sha256};

/// Deterministic identifier for results that have no service-side id.
///
/// Data sources and action resources use this so that the same inputs
/// always yield the same id.
pub fn hash_id(kind: &str, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    for part in parts {
        hasher.update([0u8]);
        hasher.update(part.as_bytes());
    }
    let digest: String = hasher
        .finalize()
        .iter()
        .take(16)
        .map(|b| format!("{:02x}", b))
        .collect();
    format!("{}-{}", kind, digest)
}
