// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! ocitf Test Harness
//!
//! Tooling for exercising ocitf resources without an OCI tenancy:
//!
//! - [`FakeOci`]: every service client of the provider, in memory, with
//!   fault injection (throttling, stale reads, failed work requests,
//!   parked or never-converging resources).
//! - [`DependencyGraph`]: which resource types depend on which.
//! - [`SweepRunner`]: deletes leftover test resources from a compartment in
//!   dependency order, sparing the configured default resources.
//!
//! ```ignore
//! let (fake, clients) = FakeOci::new().into_clients();
//! let registry = build_registry(&clients, &ProviderConfig::default())?;
//! let log_groups = registry.resource("oci_logging_log_group")?;
//! ```

mod error;
mod fake;
mod graph;
mod sweeper;

pub use error::HarnessError;
pub use fake::FakeOci;
pub use graph::DependencyGraph;
pub use sweeper::{LogGroupSweeper, StreamSweeper, SweepReport, SweepRunner, Sweeper};
