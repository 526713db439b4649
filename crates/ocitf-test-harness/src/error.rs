// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use ocitf_core::ProviderError;
use thiserror::Error;

/// Errors raised by the test harness itself.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The resource types form a dependency cycle; the listed types could
    /// not be ordered.
    #[error("Dependency cycle among resource types: {0:?}")]
    DependencyCycle(Vec<String>),

    /// A sweep listing returned something that is not a resource.
    #[error("Malformed listing for {resource_type}: {message}")]
    MalformedListing {
        resource_type: String,
        message: String,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
