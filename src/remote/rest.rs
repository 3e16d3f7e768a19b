// ABOUTME: REST client for the hosted backend's row-based CRUD surface
// ABOUTME: Implements counting, merge-duplicates upserts, and reachability checks over reqwest
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

//! REST implementation of [`RemoteStore`]
//!
//! Talks to the hosted backend's `/rest/v1/{table}` surface with bearer
//! auth. Upserts carry `Prefer: resolution=merge-duplicates` so a batch can
//! be re-sent after a crash without duplicating rows; counts use
//! `Prefer: count=exact` and read the `Content-Range` total.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use super::RemoteStore;
use crate::config::SyncConfig;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{EntityType, LocalRecord};

/// Configuration for the REST remote store
#[derive(Debug, Clone)]
pub struct RestRemoteStoreConfig {
    /// Backend base URL
    pub base_url: Url,
    /// Bearer token for the REST surface
    pub api_token: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl From<&SyncConfig> for RestRemoteStoreConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            base_url: config.backend_url.clone(),
            api_token: config.api_token.clone(),
            timeout: Duration::from_secs(config.http_timeout_secs),
        }
    }
}

/// Row shape sent to the backend on upsert
#[derive(Debug, Serialize)]
struct UpsertRow<'a> {
    id: uuid::Uuid,
    device_id: &'a str,
    recorded_at: chrono::DateTime<chrono::Utc>,
    payload: &'a serde_json::Value,
}

/// REST client for the hosted backend
pub struct RestRemoteStore {
    config: RestRemoteStoreConfig,
    http_client: reqwest::Client,
}

impl RestRemoteStore {
    /// Create a new REST remote store
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built
    pub fn new(config: RestRemoteStoreConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn table_url(&self, entity: EntityType) -> AppResult<Url> {
        self.config
            .base_url
            .join(&format!("rest/v1/{}", entity.table_name()))
            .map_err(|e| AppError::config(format!("Invalid backend URL: {e}")))
    }

    fn map_transport_error(e: &reqwest::Error) -> AppError {
        let code = if e.is_timeout() || e.is_connect() {
            ErrorCode::ExternalServiceUnavailable
        } else {
            ErrorCode::ExternalServiceError
        };
        AppError::new(code, format!("stride-backend: {e}"))
    }

    fn map_status_error(status: reqwest::StatusCode, body: &str) -> AppError {
        let code = match status.as_u16() {
            401 | 403 => ErrorCode::ExternalAuthFailed,
            500..=599 => ErrorCode::ExternalServiceUnavailable,
            _ => ErrorCode::ExternalServiceError,
        };
        AppError::new(
            code,
            format!("stride-backend: HTTP {status}: {}", truncate(body, 200)),
        )
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Parse the total from a `Content-Range` value like `0-24/57` or `*/0`
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    async fn count(&self, entity: EntityType, device_id: &str) -> AppResult<u64> {
        let url = self.table_url(entity)?;

        let device_filter = format!("eq.{device_id}");
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.config.api_token)
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .query(&[("select", "id"), ("device_id", device_filter.as_str())])
            .send()
            .await
            .map_err(|e| Self::map_transport_error(&e).with_entity(entity.as_str()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, &body).with_entity(entity.as_str()));
        }

        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| {
                AppError::external_service(
                    "stride-backend",
                    format!("Missing Content-Range total for {entity}"),
                )
            })?;

        Ok(total)
    }

    async fn upsert(
        &self,
        entity: EntityType,
        device_id: &str,
        records: &[LocalRecord],
    ) -> AppResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let url = self.table_url(entity)?;
        let rows: Vec<UpsertRow<'_>> = records
            .iter()
            .map(|r| UpsertRow {
                id: r.id,
                device_id,
                recorded_at: r.recorded_at,
                payload: &r.payload,
            })
            .collect();

        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.config.api_token)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&rows)
            .send()
            .await
            .map_err(|e| Self::map_transport_error(&e).with_entity(entity.as_str()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, &body).with_entity(entity.as_str()));
        }

        // The backend accepts or rejects the batch atomically
        Ok(records.len() as u64)
    }

    async fn healthcheck(&self) -> AppResult<()> {
        let url = self
            .config
            .base_url
            .join("rest/v1/")
            .map_err(|e| AppError::config(format!("Invalid backend URL: {e}")))?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| Self::map_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, &body));
        }

        Ok(())
    }
}
