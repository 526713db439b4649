// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! ocitf Core - Resource Lifecycle Orchestration
//!
//! This crate implements the create/poll/retry/converge contract that every
//! OCI resource type follows. Concrete resource types (see `ocitf-provider`)
//! only describe their schema, their request/response mapping and the raw
//! service calls; everything else lives here.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │       ProviderRegistry       │  type name -> handler
//!                 └──────────────┬───────────────┘
//!                                │ ResourceState (JSON)
//!                                ▼
//!                 ┌──────────────────────────────┐
//!                 │     ResourceOrchestrator     │  create / read / update / delete
//!                 └───┬──────────┬───────────┬───┘
//!                     │          │           │
//!        RequestMapper│    service call      │ResponseMapper
//!                     │          │           │
//!                     ▼          ▼           ▼
//!        ┌────────────────┐ ┌──────────┐ ┌──────────────────┐
//!        │  RetryPolicy   │ │ Resource │ │ WorkRequestWaiter│
//!        │ (every call)   │ │  (trait) │ │ LifecyclePoller  │
//!        └────────────────┘ └──────────┘ └──────────────────┘
//! ```
//!
//! # Operation flow
//!
//! | Operation | Sequence |
//! |-----------|----------|
//! | `create` | map request → create call → work request or lifecycle poll → get → map response |
//! | `read` | get → map response; not found becomes [`ReadOutcome::Gone`] |
//! | `update` | diff → refuse ForceNew → map changed fields → (update call → converge) per step → get |
//! | `delete` | delete call → converge; not found is success |
//!
//! # Error taxonomy
//!
//! | Kind | Handling |
//! |------|----------|
//! | Throttling, 5xx, eventual-consistency 404 | retried by [`RetryPolicy`] |
//! | Unexpected lifecycle state, failed work request | surfaced verbatim |
//! | Malformed input (e.g. defined tags) | surfaced immediately, no retry |
//! | Polling past the operation timeout | [`ProviderError::Timeout`] |
//! | Create accepted but never converged | [`ProviderError::CreateIncomplete`] carrying the new id |
//!
//! # Modules
//!
//! - [`action`]: one-shot action resources (Create runs the action, Read/Delete are no-ops)
//! - [`config`]: provider configuration from environment variables
//! - [`data_source`]: data source trait, pagination and list filters
//! - [`error`]: error types
//! - [`lifecycle`]: pending/target lifecycle state sets
//! - [`logging`]: tracing subscriber setup
//! - [`mapping`]: shared request/response mapping helpers (tags)
//! - [`orchestrator`]: the resource trait and its CRUD driver
//! - [`poller`]: generic poller and the lifecycle poller
//! - [`registry`]: explicit provider registry
//! - [`retry`]: retry policy
//! - [`schema`]: resource schemas, diffs and plans
//! - [`state`]: attribute-map resource state
//! - [`work_request`]: work request types and waiter

#![warn(missing_docs)]

/// One-shot action resources.
pub mod action;

/// Provider configuration loaded from environment variables.
pub mod config;

/// Data sources, pagination and list filters.
pub mod data_source;

/// Error types for provider operations.
pub mod error;

/// Pending/target lifecycle state sets.
pub mod lifecycle;

/// Tracing subscriber initialization.
pub mod logging;

/// Request/response mapping helpers shared across resource types.
pub mod mapping;

/// Resource trait and CRUD orchestration.
pub mod orchestrator;

/// Generic poller and lifecycle poller.
pub mod poller;

/// Explicit provider registry.
pub mod registry;

/// Retry policy for service calls.
pub mod retry;

/// Resource schemas, change sets and plans.
pub mod schema;

/// Attribute-map resource state.
pub mod state;

/// Work request types and waiter.
pub mod work_request;

pub use action::{ActionOrchestrator, ActionResource};
pub use config::{AuthType, ConfigError, ProviderConfig};
pub use data_source::{DataSource, Filter, Page, apply_filters, paginate};
pub use error::{ProviderError, Result, ServiceError};
pub use lifecycle::{LifecycleStateSet, ResourceLifecycle, StateClass};
pub use orchestrator::{
    ReadOutcome, Resource, ResourceModel, ResourceOrchestrator, Submitted, WorkRequestBinding,
};
pub use poller::{LifecyclePoller, Poll, PollConfig, Poller};
pub use registry::{ProviderRegistry, ProviderSchema, ResourceHandler};
pub use retry::RetryPolicy;
pub use schema::{
    AttributeMode, AttributeSchema, AttributeType, ChangeSet, Plan, ResourceSpec, Timeouts,
};
pub use state::ResourceState;
pub use work_request::{
    ActionType, WorkRequest, WorkRequestClient, WorkRequestError, WorkRequestHandle,
    WorkRequestResource, WorkRequestStatus, WorkRequestWaiter,
};
