// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tracing subscriber setup.
//!
//! The filter is read from `OCITF_LOG`, then `RUST_LOG`, falling back to
//! `ocitf_core=info,ocitf_provider=info`. Output goes to stderr so that
//! commands printing JSON on stdout stay machine readable.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "OCITF_LOG";

/// Filter used when neither `OCITF_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_DIRECTIVE: &str = "ocitf_core=info,ocitf_provider=info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber, failing if one is already set.
pub fn try_init_logging() -> Result<(), TryInitError> {
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(fmt)
        .with(filter())
        .try_init()
}

/// Install the global subscriber; a second call is a no-op.
pub fn init_logging() {
    let _ = try_init_logging();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging();
        init_logging();
        assert!(try_init_logging().is_err());
    }
}
