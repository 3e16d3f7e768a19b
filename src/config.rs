// ABOUTME: Environment configuration management for the Stride sync service
// ABOUTME: Loads backend URL, device identity, storage path and timeouts from environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

//! Environment-based configuration management
//!
//! Configuration is environment-only; there is no config file. Every knob has
//! a `STRIDE_*` variable and a sensible default, except the backend URL and
//! API token which must be provided for any command that touches the remote
//! store.

use anyhow::{Context, Result};
use std::env;
use tracing::info;
use url::Url;

/// Default local sqlite database path
pub const DEFAULT_DATABASE_URL: &str = "sqlite:stride_local.db";

/// Default HTTP timeout for remote store requests
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default number of backup snapshots retained per device
pub const DEFAULT_BACKUP_RETENTION: usize = 3;

/// Runtime configuration for the sync service
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the hosted backend (e.g. `https://api.stride.fit`)
    pub backend_url: Url,
    /// Bearer token for the backend's REST surface
    pub api_token: String,
    /// Device identifier scoping all local store keys
    pub device_id: String,
    /// Local store location (`sqlite:` URL)
    pub database_url: String,
    /// Timeout applied to each remote request
    pub http_timeout_secs: u64,
    /// Backup snapshots kept per device; older ones are trimmed
    pub backup_retention: usize,
}

impl SyncConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `STRIDE_BACKEND_URL` or `STRIDE_API_TOKEN` is
    /// missing or malformed, or if a numeric variable fails to parse.
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let backend_url = env::var("STRIDE_BACKEND_URL")
            .context("STRIDE_BACKEND_URL must be set")
            .and_then(|raw| {
                Url::parse(&raw).with_context(|| format!("Invalid STRIDE_BACKEND_URL: {raw}"))
            })?;

        let api_token = env::var("STRIDE_API_TOKEN").context("STRIDE_API_TOKEN must be set")?;
        if api_token.trim().is_empty() {
            anyhow::bail!("STRIDE_API_TOKEN must not be empty");
        }

        let config = Self {
            backend_url,
            api_token,
            device_id: env_var_or("STRIDE_DEVICE_ID", "default-device"),
            database_url: env_var_or("STRIDE_DATABASE_URL", DEFAULT_DATABASE_URL),
            http_timeout_secs: env_var_or(
                "STRIDE_HTTP_TIMEOUT_SECS",
                &DEFAULT_HTTP_TIMEOUT_SECS.to_string(),
            )
            .parse()
            .context("Invalid STRIDE_HTTP_TIMEOUT_SECS value")?,
            backup_retention: env_var_or(
                "STRIDE_BACKUP_RETENTION",
                &DEFAULT_BACKUP_RETENTION.to_string(),
            )
            .parse()
            .context("Invalid STRIDE_BACKUP_RETENTION value")?,
        };

        config.validate()?;
        config.log_summary();
        Ok(config)
    }

    /// Validate cross-field constraints
    fn validate(&self) -> Result<()> {
        if self.device_id.trim().is_empty() {
            anyhow::bail!("STRIDE_DEVICE_ID must not be empty");
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("STRIDE_HTTP_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }

    fn log_summary(&self) {
        info!(
            backend.url = %self.backend_url,
            device.id = %self.device_id,
            database.url = %self.database_url,
            http.timeout_secs = %self.http_timeout_secs,
            backup.retention = %self.backup_retention,
            "Configuration loaded"
        );
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
