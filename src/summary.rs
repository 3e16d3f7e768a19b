// ABOUTME: Data summary reader computing per-entity local and remote record counts
// ABOUTME: Side-effect free and idempotent; storage failures surface as typed errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

//! # Data Summary Reader
//!
//! Counts how many records of each tracked entity type exist on-device and
//! in the remote store. Reads are independent, non-mutating, and idempotent:
//! two reads without intervening writes return identical counts. An
//! unreadable local store is an error, not a summary full of zeros — callers
//! must be able to tell "no data" apart from "storage corrupt".

use std::sync::Arc;
use tracing::debug;

use crate::errors::AppResult;
use crate::models::{DataSummary, EntityType};
use crate::remote::RemoteStore;
use crate::store::{records, LocalStore};

/// Computes [`DataSummary`] snapshots for a device
pub struct DataSummaryReader {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
}

impl DataSummaryReader {
    /// Create a new summary reader over the given stores
    #[must_use]
    pub fn new(local: Arc<dyn LocalStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self { local, remote }
    }

    /// Count local and remote records of every entity type for one device
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if the local store is
    /// unreadable, or an external-service error if the remote store cannot
    /// be queried. Counts are never silently zeroed on failure.
    pub async fn read(&self, device_id: &str) -> AppResult<DataSummary> {
        let mut summary = DataSummary::default();

        for entity in EntityType::ALL {
            let local_records =
                records::read_records(self.local.as_ref(), entity, device_id).await?;
            let remote_count = self.remote.count(entity, device_id).await?;

            debug!(
                entity = %entity,
                device.id = %device_id,
                count.local = local_records.len(),
                count.remote = remote_count,
                "Entity counts"
            );

            summary.local.set(entity, local_records.len() as u64);
            summary.remote.set(entity, remote_count);
        }

        Ok(summary)
    }

    /// Count only the local side, without touching the network
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if the local store is
    /// unreadable.
    pub async fn read_local(&self, device_id: &str) -> AppResult<DataSummary> {
        let mut summary = DataSummary::default();

        for entity in EntityType::ALL {
            let local_records =
                records::read_records(self.local.as_ref(), entity, device_id).await?;
            summary.local.set(entity, local_records.len() as u64);
        }

        Ok(summary)
    }
}
