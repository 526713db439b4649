// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for ocitf-core.
//!
//! Every service call, mapping step and convergence wait reports a
//! [`ProviderError`]. Only [`ProviderError::Service`] carries an HTTP-style
//! status; the retry policy keys its decisions off that status and code.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Result type using ProviderError.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Error response returned by an OCI service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// HTTP status code.
    pub status: u16,
    /// Service error code (e.g. `NotAuthorizedOrNotFound`, `TooManyRequests`).
    pub code: String,
    /// Human readable message from the service.
    pub message: String,
    /// Request id assigned by the service, for support tickets.
    pub opc_request_id: Option<String>,
}

impl ServiceError {
    /// Create a new service error.
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            opc_request_id: None,
        }
    }

    /// The canonical 404 returned for missing (or invisible) resources.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "NotAuthorizedOrNotFound", message)
    }

    /// The canonical 429 returned when a tenancy is throttled.
    pub fn throttled() -> Self {
        Self::new(429, "TooManyRequests", "Too many requests for the tenancy")
    }

    /// Attach the service request id.
    pub fn with_request_id(mut self, opc_request_id: impl Into<String>) -> Self {
        self.opc_request_id = Some(opc_request_id.into());
        self
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}, {}", self.status, self.code, self.message)?;
        if let Some(request_id) = &self.opc_request_id {
            write!(f, " (opc-request-id: {})", request_id)?;
        }
        Ok(())
    }
}

/// Errors that can occur while orchestrating a resource.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// The service rejected or failed a call.
    #[error("service error: {0}")]
    Service(ServiceError),

    /// Polling did not converge within the operation timeout.
    #[error("timed out after {waited:?} waiting for {operation} (last observed: {last_observed})")]
    Timeout {
        /// What was being waited for.
        operation: String,
        /// The timeout that elapsed.
        waited: Duration,
        /// Last observed lifecycle state or work request status.
        last_observed: String,
    },

    /// The resource reached a lifecycle state outside both the pending and target sets.
    #[error(
        "resource {resource} entered unexpected lifecycle state {state} (pending: {pending:?}, target: {target:?})"
    )]
    UnexpectedState {
        /// Resource identifier.
        resource: String,
        /// The state reported by the service, verbatim.
        state: String,
        /// Pending states that were being waited through.
        pending: Vec<String>,
        /// Target states that were being waited for.
        target: Vec<String>,
    },

    /// A work request finished unsuccessfully.
    #[error("work request {work_request_id} finished with status {status}: {}", .errors.join("; "))]
    WorkRequestFailed {
        /// Work request identifier.
        work_request_id: String,
        /// Terminal status (FAILED or CANCELED).
        status: String,
        /// Error messages reported by the service for this work request.
        errors: Vec<String>,
    },

    /// The create call succeeded but the new resource never became ready.
    ///
    /// The resource exists remotely under `id`; callers keep it in state as
    /// tainted rather than forgetting it.
    #[error("resource {id} was created but did not become ready: {source}")]
    CreateIncomplete {
        /// Identifier the service assigned to the new resource.
        id: String,
        /// Why convergence failed.
        #[source]
        source: Box<ProviderError>,
    },

    /// User input failed validation before any service call was made.
    #[error("invalid value for {attribute}: {message}")]
    Validation {
        /// Attribute that failed validation.
        attribute: String,
        /// What is wrong with it.
        message: String,
    },

    /// Changed attributes can only be applied by replacing the resource.
    #[error("attributes {attributes:?} cannot be updated in place; the resource must be replaced")]
    ForceNewChange {
        /// The ForceNew attributes whose values changed.
        attributes: Vec<String>,
    },

    /// A lifecycle state set declaration is invalid.
    #[error("invalid lifecycle state set: {0}")]
    InvalidStateSet(String),

    /// Resource state has no identifier where one is required.
    #[error("resource state for {0} has no id")]
    MissingId(String),

    /// No resource or data source registered under this name.
    #[error("unknown resource type: {0}")]
    UnknownType(String),

    /// A resource or data source name was registered twice.
    #[error("duplicate registration for {0}")]
    DuplicateRegistration(String),

    /// Provider configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization of resource state failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Shorthand for a validation error.
    pub fn validation(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Validation {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Returns the service status code, if this is a service error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Service(err) => Some(err.status),
            _ => None,
        }
    }

    /// Identifier of a resource left behind by an unfinished create.
    pub fn created_id(&self) -> Option<&str> {
        match self {
            ProviderError::CreateIncomplete { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Returns true if the service reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<ServiceError> for ProviderError {
    fn from(err: ServiceError) -> Self {
        ProviderError::Service(err)
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Serialization(err.to_string())
    }
}
