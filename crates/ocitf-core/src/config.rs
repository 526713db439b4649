// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.
//!
//! Every setting is looked up twice: first as `TF_VAR_<name>` (what a
//! Terraform configuration exports), then as `OCI_<NAME>` (what the OCI CLI
//! and SDKs use). Empty values count as unset.

use std::time::Duration;

use serde::Serialize;
use strum::{Display, EnumString};

/// How the provider authenticates against OCI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize)]
#[strum(ascii_case_insensitive)]
pub enum AuthType {
    /// API signing key (tenancy, user, fingerprint, private key).
    #[default]
    ApiKey,
    /// Instance principal of the compute instance running the provider.
    InstancePrincipal,
    /// Resource principal (functions, jobs).
    ResourcePrincipal,
    /// Session token from `oci session authenticate`.
    SecurityToken,
}

/// Provider configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderConfig {
    /// Region identifier, e.g. `us-ashburn-1`.
    pub region: String,
    /// Tenancy OCID.
    pub tenancy_ocid: String,
    /// User OCID (API key auth only).
    pub user_ocid: String,
    /// API key fingerprint (API key auth only).
    pub fingerprint: String,
    /// Path to the PEM private key (API key auth only).
    pub private_key_path: String,
    /// Authentication method.
    pub auth: AuthType,
    /// Profile in `~/.oci/config` to read missing values from.
    pub config_file_profile: String,
    /// Total time budget for retrying a single service call.
    #[serde(serialize_with = "serialize_secs")]
    pub retry_duration: Option<Duration>,
    /// Make exactly one attempt per service call.
    pub disable_auto_retries: bool,
}

fn serialize_secs<S: serde::Serializer>(
    value: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(d) => serializer.serialize_some(&d.as_secs()),
        None => serializer.serialize_none(),
    }
}

impl ProviderConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Settings (each read as `TF_VAR_<name>` then `OCI_<NAME>`):
    /// - `region`
    /// - `tenancy_ocid`, `user_ocid`, `fingerprint`, `private_key_path`
    /// - `auth`: `ApiKey` (default), `InstancePrincipal`, `ResourcePrincipal`, `SecurityToken`
    /// - `config_file_profile` (default: `DEFAULT`)
    /// - `retry_duration_seconds`: retry budget per call
    /// - `disable_auto_retries`: `true`/`false` (default: `false`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth = match env_setting("auth") {
            Some(value) => value
                .parse::<AuthType>()
                .map_err(|_| ConfigError::Invalid("auth".to_string(), format!("unknown auth type '{}'", value)))?,
            None => AuthType::default(),
        };

        let retry_duration = match env_setting("retry_duration_seconds") {
            Some(value) => Some(Duration::from_secs(value.parse().map_err(|_| {
                ConfigError::Invalid(
                    "retry_duration_seconds".to_string(),
                    "must be a non-negative integer".to_string(),
                )
            })?)),
            None => None,
        };

        let disable_auto_retries = match env_setting("disable_auto_retries") {
            Some(value) => parse_bool("disable_auto_retries", &value)?,
            None => false,
        };

        Ok(Self {
            region: env_setting_with_blank_default("region"),
            tenancy_ocid: env_setting_with_blank_default("tenancy_ocid"),
            user_ocid: env_setting_with_blank_default("user_ocid"),
            fingerprint: env_setting_with_blank_default("fingerprint"),
            private_key_path: env_setting_with_blank_default("private_key_path"),
            auth,
            config_file_profile: env_setting_with_default("config_file_profile", "DEFAULT"),
            retry_duration,
            disable_auto_retries,
        })
    }

    /// Check that the settings required by the chosen auth type are present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.is_empty() {
            return Err(ConfigError::Missing("region".to_string()));
        }
        if self.auth == AuthType::ApiKey {
            for (name, value) in [
                ("tenancy_ocid", &self.tenancy_ocid),
                ("user_ocid", &self.user_ocid),
                ("fingerprint", &self.fingerprint),
                ("private_key_path", &self.private_key_path),
            ] {
                if value.is_empty() {
                    return Err(ConfigError::Missing(name.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the authentication method.
    pub fn with_auth(mut self, auth: AuthType) -> Self {
        self.auth = auth;
        self
    }

    /// Set the retry budget per service call.
    pub fn with_retry_duration(mut self, duration: Duration) -> Self {
        self.retry_duration = Some(duration);
        self
    }

    /// Enable or disable automatic retries.
    pub fn with_disable_auto_retries(mut self, disable: bool) -> Self {
        self.disable_auto_retries = disable;
        self
    }
}

/// Look up a setting as `TF_VAR_<name>`, then `OCI_<NAME>`.
pub fn env_setting(name: &str) -> Option<String> {
    [
        format!("TF_VAR_{}", name),
        format!("OCI_{}", name.to_uppercase()),
    ]
    .iter()
    .filter_map(|key| std::env::var(key).ok())
    .find(|value| !value.is_empty())
}

/// Look up a setting, falling back to `default`.
pub fn env_setting_with_default(name: &str, default: &str) -> String {
    env_setting(name).unwrap_or_else(|| default.to_string())
}

/// Look up a setting, falling back to an empty string.
pub fn env_setting_with_blank_default(name: &str) -> String {
    env_setting_with_default(name, "")
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::Invalid(
            name.to_string(),
            "must be true or false".to_string(),
        )),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required setting is missing.
    #[error("missing required setting: {0}")]
    Missing(String),

    /// A setting has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to set env vars for a test and restore them after
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self { vars: Vec::new() }
        }

        fn set(&mut self, key: &str, value: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via #[serial], so no concurrent access
            unsafe { env::set_var(key, value) };
        }

        fn remove(&mut self, key: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via #[serial], so no concurrent access
            unsafe { env::remove_var(key) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.drain(..).rev() {
                // SAFETY: Tests are serialized via #[serial], so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(&key, v),
                        None => env::remove_var(&key),
                    }
                }
            }
        }
    }

    const ALL_KEYS: &[&str] = &[
        "region",
        "tenancy_ocid",
        "user_ocid",
        "fingerprint",
        "private_key_path",
        "auth",
        "config_file_profile",
        "retry_duration_seconds",
        "disable_auto_retries",
    ];

    fn clear_all(guard: &mut EnvGuard) {
        for key in ALL_KEYS {
            guard.remove(&format!("TF_VAR_{}", key));
            guard.remove(&format!("OCI_{}", key.to_uppercase()));
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env_with_defaults() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);

        let config = ProviderConfig::from_env().unwrap();
        assert_eq!(config.region, "");
        assert_eq!(config.auth, AuthType::ApiKey);
        assert_eq!(config.config_file_profile, "DEFAULT");
        assert_eq!(config.retry_duration, None);
        assert!(!config.disable_auto_retries);
    }

    #[test]
    #[serial]
    fn test_tf_var_takes_precedence_over_oci_prefix() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("TF_VAR_region", "us-ashburn-1");
        guard.set("OCI_REGION", "eu-frankfurt-1");
        guard.set("OCI_TENANCY_OCID", "ocid1.tenancy.oc1..aaaa");

        let config = ProviderConfig::from_env().unwrap();
        assert_eq!(config.region, "us-ashburn-1");
        assert_eq!(config.tenancy_ocid, "ocid1.tenancy.oc1..aaaa");
    }

    #[test]
    #[serial]
    fn test_empty_value_counts_as_unset() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("TF_VAR_region", "");
        guard.set("OCI_REGION", "ap-tokyo-1");

        assert_eq!(env_setting("region").as_deref(), Some("ap-tokyo-1"));
        assert!(env_setting("fingerprint").is_none());
    }

    #[test]
    #[serial]
    fn test_retry_settings_parsed() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("TF_VAR_retry_duration_seconds", "120");
        guard.set("TF_VAR_disable_auto_retries", "TRUE");
        guard.set("TF_VAR_auth", "instanceprincipal");

        let config = ProviderConfig::from_env().unwrap();
        assert_eq!(config.retry_duration, Some(Duration::from_secs(120)));
        assert!(config.disable_auto_retries);
        assert_eq!(config.auth, AuthType::InstancePrincipal);
    }

    #[test]
    #[serial]
    fn test_invalid_values_rejected() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("TF_VAR_retry_duration_seconds", "soon");
        assert!(matches!(
            ProviderConfig::from_env(),
            Err(ConfigError::Invalid(name, _)) if name == "retry_duration_seconds"
        ));

        guard.set("TF_VAR_retry_duration_seconds", "10");
        guard.set("TF_VAR_auth", "Password");
        assert!(matches!(
            ProviderConfig::from_env(),
            Err(ConfigError::Invalid(name, _)) if name == "auth"
        ));
    }

    #[test]
    fn test_validate_api_key_requires_credentials() {
        let config = ProviderConfig::new().with_region("us-phoenix-1");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing(name)) if name == "tenancy_ocid"
        ));

        let config = ProviderConfig::new()
            .with_region("us-phoenix-1")
            .with_auth(AuthType::InstancePrincipal);
        assert!(config.validate().is_ok());

        let config = ProviderConfig::new().with_auth(AuthType::ResourcePrincipal);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing(name)) if name == "region"
        ));
    }
}
