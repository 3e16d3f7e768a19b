// ABOUTME: Mock remote store for tests (no network calls)
// ABOUTME: Records upserted rows in memory and supports per-entity failure injection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::RemoteStore;
use crate::errors::{AppError, AppResult};
use crate::models::{EntityType, LocalRecord};

/// Mock remote store for testing (no network calls)
///
/// Stores accepted record ids per entity and device, deduplicating on id
/// like the real backend's merge-duplicates upsert. `fail_entity` makes one
/// entity type's upserts fail, which is how partial-failure tests are built.
#[derive(Default)]
pub struct MockRemoteStore {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    rows: HashMap<(EntityType, String), HashSet<Uuid>>,
    failing: HashSet<EntityType>,
    upsert_calls: Vec<(EntityType, usize)>,
    unavailable: bool,
    latency: Option<std::time::Duration>,
}

impl MockRemoteStore {
    /// Create an empty mock backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upsert for `entity` fail
    pub async fn fail_entity(&self, entity: EntityType) {
        self.state.lock().await.failing.insert(entity);
    }

    /// Clear a previously injected failure
    pub async fn heal_entity(&self, entity: EntityType) {
        self.state.lock().await.failing.remove(&entity);
    }

    /// Make the whole backend unreachable
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Add artificial latency to every upsert, for in-flight tests
    pub async fn set_latency(&self, latency: std::time::Duration) {
        self.state.lock().await.latency = Some(latency);
    }

    /// Rows stored for one entity and device
    pub async fn stored_count(&self, entity: EntityType, device_id: &str) -> u64 {
        self.state
            .lock()
            .await
            .rows
            .get(&(entity, device_id.to_owned()))
            .map_or(0, |ids| ids.len() as u64)
    }

    /// Upsert calls observed so far, as (entity, batch size) pairs
    pub async fn upsert_calls(&self) -> Vec<(EntityType, usize)> {
        self.state.lock().await.upsert_calls.clone()
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn count(&self, entity: EntityType, device_id: &str) -> AppResult<u64> {
        let state = self.state.lock().await;
        if state.unavailable {
            return Err(AppError::external_service(
                "mock-backend",
                "backend unreachable",
            ));
        }
        Ok(state
            .rows
            .get(&(entity, device_id.to_owned()))
            .map_or(0, |ids| ids.len() as u64))
    }

    async fn upsert(
        &self,
        entity: EntityType,
        device_id: &str,
        records: &[LocalRecord],
    ) -> AppResult<u64> {
        let latency = self.state.lock().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().await;
        state.upsert_calls.push((entity, records.len()));

        if state.unavailable {
            return Err(AppError::external_service(
                "mock-backend",
                "backend unreachable",
            ));
        }
        if state.failing.contains(&entity) {
            return Err(
                AppError::external_service("mock-backend", format!("upsert failed for {entity}"))
                    .with_entity(entity.as_str()),
            );
        }

        let ids = state
            .rows
            .entry((entity, device_id.to_owned()))
            .or_default();
        for record in records {
            ids.insert(record.id);
        }
        Ok(records.len() as u64)
    }

    async fn healthcheck(&self) -> AppResult<()> {
        if self.state.lock().await.unavailable {
            return Err(AppError::external_service(
                "mock-backend",
                "backend unreachable",
            ));
        }
        Ok(())
    }
}
