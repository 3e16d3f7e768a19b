// ABOUTME: Remote store abstraction for the hosted backend's row-based CRUD surface
// ABOUTME: Exposes the RemoteStore trait plus REST and mock implementations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

//! # Remote Store
//!
//! The hosted backend is the system of record after migration. This crate
//! only needs three things from it: per-entity row counts, idempotent batch
//! upserts keyed on the device-assigned record id, and a reachability check.
//! Everything else about the backend (schema, queries) belongs to the
//! backend, not here.

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::models::{EntityType, LocalRecord};

/// REST client implementation against the hosted backend
pub mod rest;

/// Mock implementation with failure injection, for tests
pub mod mock;

pub use mock::MockRemoteStore;
pub use rest::{RestRemoteStore, RestRemoteStoreConfig};

/// Row-based access to the hosted backend, one table per entity type
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Count rows already present for this device and entity type
    ///
    /// # Errors
    ///
    /// Returns an external-service error if the backend is unreachable or
    /// rejects the request.
    async fn count(&self, entity: EntityType, device_id: &str) -> AppResult<u64>;

    /// Upsert a batch of records, keyed on each record's stable local id
    ///
    /// Re-sending an already-stored record merges instead of duplicating.
    /// Returns the number of records the backend accepted.
    ///
    /// # Errors
    ///
    /// Returns an external-service error if the backend is unreachable or
    /// rejects the batch; a rejected batch stores nothing.
    async fn upsert(
        &self,
        entity: EntityType,
        device_id: &str,
        records: &[LocalRecord],
    ) -> AppResult<u64>;

    /// Cheap reachability check against the backend
    ///
    /// # Errors
    ///
    /// Returns an external-service error if the backend is unreachable.
    async fn healthcheck(&self) -> AppResult<()>;
}
