// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request/response mapping helpers shared by every resource type.
//!
//! Defined tags are flat in state (`"Operations.CostCenter" = "42"`) and
//! nested per namespace on the wire (`{"Operations": {"CostCenter": "42"}}`).

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{ProviderError, Result};

/// Defined tags as the service expects them: namespace → key → value.
pub type DefinedTags = BTreeMap<String, BTreeMap<String, Value>>;

/// Freeform tags; identical in state and on the wire.
pub type FreeformTags = BTreeMap<String, String>;

/// Nest flat `namespace.key` defined tags for a request.
///
/// The key is split at the first dot. A key without a dot, or with an empty
/// namespace or key, is rejected before any call is made.
pub fn defined_tags_to_request(flat: &BTreeMap<String, Value>) -> Result<DefinedTags> {
    let mut nested = DefinedTags::new();
    for (full_key, value) in flat {
        let Some((namespace, key)) = full_key.split_once('.') else {
            return Err(ProviderError::validation(
                "defined_tags",
                format!("tag key '{}' must be of the form <namespace>.<key>", full_key),
            ));
        };
        if namespace.is_empty() || key.is_empty() {
            return Err(ProviderError::validation(
                "defined_tags",
                format!("tag key '{}' has an empty namespace or key", full_key),
            ));
        }
        nested
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.clone());
    }
    Ok(nested)
}

/// Flatten defined tags from a response into `namespace.key` entries.
pub fn defined_tags_from_response(nested: &DefinedTags) -> BTreeMap<String, Value> {
    nested
        .iter()
        .flat_map(|(namespace, tags)| {
            tags.iter()
                .map(move |(key, value)| (format!("{}.{}", namespace, key), value.clone()))
        })
        .collect()
}

/// Map optional flat defined tags to the request shape.
pub fn optional_defined_tags(flat: Option<&BTreeMap<String, Value>>) -> Result<Option<DefinedTags>> {
    flat.map(defined_tags_to_request).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flat(entries: &[(&str, Value)]) -> BTreeMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_nesting_by_namespace() {
        let tags = flat(&[
            ("Operations.CostCenter", json!("42")),
            ("Operations.Owner", json!("team-a")),
            ("Finance.Project", json!("apollo")),
        ]);
        let nested = defined_tags_to_request(&tags).unwrap();

        assert_eq!(nested.len(), 2);
        assert_eq!(nested["Operations"]["CostCenter"], json!("42"));
        assert_eq!(nested["Finance"]["Project"], json!("apollo"));
        assert_eq!(defined_tags_from_response(&nested), tags);
    }

    #[test]
    fn test_split_at_first_dot() {
        let nested = defined_tags_to_request(&flat(&[("ns.a.b", json!("v"))])).unwrap();
        assert_eq!(nested["ns"]["a.b"], json!("v"));
    }

    #[test]
    fn test_missing_namespace_rejected() {
        for key in ["CostCenter", ".CostCenter", "Operations."] {
            let err = defined_tags_to_request(&flat(&[(key, json!("42"))])).unwrap_err();
            assert!(
                matches!(err, ProviderError::Validation { ref attribute, .. } if attribute == "defined_tags"),
                "{key} should be rejected"
            );
        }
    }

    #[test]
    fn test_optional_none_passes_through() {
        assert_eq!(optional_defined_tags(None).unwrap(), None);
    }
}
