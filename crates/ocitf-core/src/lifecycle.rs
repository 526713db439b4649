// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pending/target lifecycle state sets.
//!
//! Each mutating operation of a polled resource declares which lifecycle
//! states mean "still working" and which mean "done". Anything else the
//! service reports is unexpected and ends the wait with an error.

use std::collections::BTreeSet;

use crate::error::{ProviderError, Result};

/// Classification of an observed lifecycle state against a [`LifecycleStateSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    /// Operation still in progress; keep polling.
    Pending,
    /// Operation finished successfully.
    Target,
    /// State outside both sets; stop with an error.
    Unexpected,
}

/// Pending and target states for one operation.
///
/// The two sets never overlap and the target set is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleStateSet {
    pending: BTreeSet<String>,
    target: BTreeSet<String>,
    not_found_is_target: bool,
}

impl LifecycleStateSet {
    /// Build a state set, rejecting overlapping or empty-target declarations.
    pub fn new(pending: &[&str], target: &[&str]) -> Result<Self> {
        let pending: BTreeSet<String> = pending.iter().map(|s| s.to_string()).collect();
        let target: BTreeSet<String> = target.iter().map(|s| s.to_string()).collect();

        if target.is_empty() {
            return Err(ProviderError::InvalidStateSet(
                "target set must not be empty".to_string(),
            ));
        }

        let overlap: Vec<&String> = pending.intersection(&target).collect();
        if !overlap.is_empty() {
            return Err(ProviderError::InvalidStateSet(format!(
                "states {:?} are both pending and target",
                overlap
            )));
        }

        Ok(Self {
            pending,
            target,
            not_found_is_target: false,
        })
    }

    /// Treat a not-found response as reaching the target (delete sets).
    pub fn with_not_found_as_target(mut self) -> Self {
        self.not_found_is_target = true;
        self
    }

    /// Classify an observed state.
    pub fn classify(&self, state: &str) -> StateClass {
        if self.target.contains(state) {
            StateClass::Target
        } else if self.pending.contains(state) {
            StateClass::Pending
        } else {
            StateClass::Unexpected
        }
    }

    /// Whether a vanished resource counts as success.
    pub fn not_found_is_target(&self) -> bool {
        self.not_found_is_target
    }

    /// Pending states, sorted.
    pub fn pending(&self) -> Vec<String> {
        self.pending.iter().cloned().collect()
    }

    /// Target states, sorted.
    pub fn target(&self) -> Vec<String> {
        self.target.iter().cloned().collect()
    }
}

/// State sets for every operation of a polled resource type.
///
/// An operation without a set does not poll; it relies on a work request or
/// completes synchronously.
#[derive(Debug, Clone, Default)]
pub struct ResourceLifecycle {
    /// Sets for create.
    pub create: Option<LifecycleStateSet>,
    /// Sets for update.
    pub update: Option<LifecycleStateSet>,
    /// Sets for delete.
    pub delete: Option<LifecycleStateSet>,
}

impl ResourceLifecycle {
    /// A lifecycle with no polling for any operation.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the create states.
    pub fn with_create(mut self, states: LifecycleStateSet) -> Self {
        self.create = Some(states);
        self
    }

    /// Set the update states.
    pub fn with_update(mut self, states: LifecycleStateSet) -> Self {
        self.update = Some(states);
        self
    }

    /// Set the delete states.
    pub fn with_delete(mut self, states: LifecycleStateSet) -> Self {
        self.delete = Some(states);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let states = LifecycleStateSet::new(&["CREATING"], &["ACTIVE"]).unwrap();
        assert_eq!(states.classify("CREATING"), StateClass::Pending);
        assert_eq!(states.classify("ACTIVE"), StateClass::Target);
        assert_eq!(states.classify("FAILED"), StateClass::Unexpected);
        assert_eq!(states.classify("active"), StateClass::Unexpected);
    }

    #[test]
    fn test_overlap_rejected() {
        let err = LifecycleStateSet::new(&["CREATING", "ACTIVE"], &["ACTIVE"]).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidStateSet(msg) if msg.contains("ACTIVE")));
    }

    #[test]
    fn test_empty_target_rejected() {
        assert!(LifecycleStateSet::new(&["DELETING"], &[]).is_err());
    }

    #[test]
    fn test_empty_pending_allowed() {
        let states = LifecycleStateSet::new(&[], &["ACTIVE"]).unwrap();
        assert!(states.pending().is_empty());
        assert_eq!(states.target(), vec!["ACTIVE".to_string()]);
    }

    #[test]
    fn test_not_found_as_target() {
        let states = LifecycleStateSet::new(&["DELETING"], &["DELETED"]).unwrap();
        assert!(!states.not_found_is_target());
        assert!(states.with_not_found_as_target().not_found_is_target());
    }
}
