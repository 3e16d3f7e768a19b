// ABOUTME: Migration orchestrator sequencing backup, per-entity transfer, and status finalization
// ABOUTME: Isolates per-entity failures, skips already-migrated records, and publishes progress
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

//! # Migration Orchestrator
//!
//! [`MigrationService`] is the one service object the rest of the system
//! talks to: constructed once over the local and remote stores, passed by
//! reference to consumers, with explicit `refresh_status`/`subscribe`
//! methods instead of implicit re-render triggers.
//!
//! A run is a fixed sequence of awaited steps: backup, one transfer per
//! entity type, finalize. One entity type failing does not abort the rest;
//! the failed type is reported in the result and the run stays retryable.
//! Migration is not transactional and exposes no cancellation: once started,
//! a run executes to the end of the sequence. Retries are safe because
//! records carry a `migrated` marker and remote upserts merge on the stable
//! local id.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::backup::{BackupInfo, BackupManager};
use crate::errors::{AppError, AppResult};
use crate::models::{
    DataSummary, EntityOutcome, EntityType, LocalRecord, MigrationProgress, MigrationResult,
    MigrationStep,
};
use crate::remote::RemoteStore;
use crate::status::{StatusTracker, StatusView};
use crate::store::{records, LocalStore};
use crate::summary::DataSummaryReader;

/// Orchestrates the local-to-cloud migration flow for one device
pub struct MigrationService {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    device_id: String,
    backup: BackupManager,
    status: StatusTracker,
    summary: DataSummaryReader,
    progress_tx: watch::Sender<MigrationProgress>,
    // Held for the duration of a run; a second caller fails fast instead of
    // queueing behind the first
    run_guard: Mutex<()>,
}

impl MigrationService {
    /// Create the migration service for one device
    #[must_use]
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        device_id: impl Into<String>,
        backup_retention: usize,
    ) -> Self {
        let device_id = device_id.into();
        let (progress_tx, _) = watch::channel(MigrationProgress::idle());

        Self {
            backup: BackupManager::new(local.clone(), backup_retention),
            status: StatusTracker::new(local.clone(), device_id.clone()),
            summary: DataSummaryReader::new(local.clone(), remote.clone()),
            local,
            remote,
            device_id,
            progress_tx,
            run_guard: Mutex::new(()),
        }
    }

    /// The device this service is scoped to
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Current status projection (does not touch storage)
    #[must_use]
    pub fn status(&self) -> StatusView {
        self.status.view()
    }

    /// Subscribe to status projection changes
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<StatusView> {
        self.status.subscribe()
    }

    /// Subscribe to progress updates for in-flight runs
    #[must_use]
    pub fn subscribe_progress(&self) -> watch::Receiver<MigrationProgress> {
        self.progress_tx.subscribe()
    }

    /// Recompute the status projection from storage
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if local counts or the
    /// persisted status cannot be read.
    pub async fn refresh_status(&self) -> AppResult<StatusView> {
        let pending = self.pending_total().await?;
        self.status.refresh(pending).await
    }

    /// Count local and remote records for this device
    ///
    /// # Errors
    ///
    /// Returns a storage error if the local store is unreadable or an
    /// external-service error if the backend cannot be queried.
    pub async fn data_summary(&self) -> AppResult<DataSummary> {
        self.summary.read(&self.device_id).await
    }

    /// Snapshot local data without migrating
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if the snapshot fails
    pub async fn create_backup(&self) -> AppResult<BackupInfo> {
        self.backup.create_backup(&self.device_id).await
    }

    /// Access the backup manager for list/restore operations
    #[must_use]
    pub const fn backups(&self) -> &BackupManager {
        &self.backup
    }

    /// Run the migration sequence: backup, transfer each entity type, finalize
    ///
    /// One entity type failing does not abort the remaining types; the
    /// failure is recorded in the result's `errors` and the run stays
    /// retryable. Records already marked migrated are skipped, so retries
    /// only re-send what has not landed.
    ///
    /// # Errors
    ///
    /// Returns `MigrationInProgress` if another run is in flight, or a
    /// storage error if the pre-transfer backup cannot be taken. Per-entity
    /// transfer failures are reported in the returned result, not as `Err`.
    pub async fn perform_migration(&self) -> AppResult<MigrationResult> {
        let Ok(_guard) = self.run_guard.try_lock() else {
            return Err(AppError::migration_in_progress().with_device_id(self.device_id.clone()));
        };

        let total_steps = 2 + EntityType::ALL.len() as u32;
        let mut completed_steps = 0u32;

        info!(device.id = %self.device_id, "Migration run starting");

        // Step 1: snapshot before anything leaves the device. A backup
        // failure aborts the whole run since there is nothing to fall back
        // to if a later write corrupts local data.
        self.publish_progress(MigrationStep::Backup, completed_steps, total_steps);
        self.backup.create_backup(&self.device_id).await?;
        completed_steps += 1;

        // Step 2..n: transfer each entity type independently
        let mut outcomes = Vec::with_capacity(EntityType::ALL.len());
        let mut errors = Vec::new();

        for entity in EntityType::ALL {
            self.publish_progress(
                MigrationStep::Transfer(entity),
                completed_steps,
                total_steps,
            );

            let outcome = self.transfer_entity(entity).await;
            if let Some(message) = &outcome.error {
                warn!(
                    device.id = %self.device_id,
                    entity = %entity,
                    error = %message,
                    "Entity migration failed, continuing with remaining types"
                );
                errors.push(format!("{entity}: {message}"));
            } else {
                info!(
                    device.id = %self.device_id,
                    entity = %entity,
                    migrated = outcome.migrated,
                    skipped = outcome.skipped,
                    "Entity migrated"
                );
            }
            outcomes.push(outcome);
            completed_steps += 1;
        }

        // Finalize: only a clean sweep marks the device completed
        self.publish_progress(MigrationStep::Finalize, completed_steps, total_steps);
        let success = outcomes.iter().all(EntityOutcome::succeeded);
        let completed_at = Utc::now();

        if success {
            self.status.mark_completed(completed_at).await?;
            info!(
                device.id = %self.device_id,
                migrated = outcomes.iter().map(|o| o.migrated).sum::<u64>(),
                "Migration run completed"
            );
        } else {
            // Leave the device in the required state so the caller can retry
            let pending = self.pending_total().await?;
            self.status.refresh(pending).await?;
            warn!(
                device.id = %self.device_id,
                failed_entities = errors.len(),
                "Migration run finished with failures"
            );
        }
        completed_steps += 1;
        self.publish_progress(MigrationStep::Finalize, completed_steps, total_steps);

        Ok(MigrationResult {
            success,
            outcomes,
            errors,
            completed_at,
        })
    }

    /// Transfer one entity type; failures are folded into the outcome
    async fn transfer_entity(&self, entity: EntityType) -> EntityOutcome {
        match self.try_transfer_entity(entity).await {
            Ok((migrated, skipped)) => EntityOutcome {
                entity,
                migrated,
                skipped,
                error: None,
            },
            Err(e) => EntityOutcome {
                entity,
                migrated: 0,
                skipped: 0,
                error: Some(e.to_string()),
            },
        }
    }

    async fn try_transfer_entity(&self, entity: EntityType) -> AppResult<(u64, u64)> {
        let all = records::read_records(self.local.as_ref(), entity, &self.device_id).await?;

        let pending: Vec<LocalRecord> =
            all.iter().filter(|r| !r.migrated).cloned().collect();
        let skipped = (all.len() - pending.len()) as u64;

        if pending.is_empty() {
            return Ok((0, skipped));
        }

        let accepted = self
            .remote
            .upsert(entity, &self.device_id, &pending)
            .await?;

        // Mark locally only after the remote store accepted the batch. A
        // crash between upsert and mark re-sends the batch next run, which
        // the merge-duplicates upsert absorbs.
        let ids: Vec<_> = pending.iter().map(|r| r.id).collect();
        records::mark_migrated(self.local.as_ref(), entity, &self.device_id, &ids).await?;

        Ok((accepted, skipped))
    }

    /// Records not yet marked migrated, across all entity types
    async fn pending_total(&self) -> AppResult<u64> {
        let mut pending = 0u64;
        for entity in EntityType::ALL {
            let batch = records::read_records(self.local.as_ref(), entity, &self.device_id).await?;
            pending += batch.iter().filter(|r| !r.migrated).count() as u64;
        }
        Ok(pending)
    }

    fn publish_progress(&self, step: MigrationStep, progress: u32, total: u32) {
        self.progress_tx.send_replace(MigrationProgress {
            step,
            progress,
            total,
        });
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::remote::MockRemoteStore;
    use crate::store::MemoryStore;

    async fn seed(store: &MemoryStore, entity: EntityType, device: &str, n: usize) {
        let batch: Vec<LocalRecord> = (0..n)
            .map(|i| LocalRecord::new(serde_json::json!({ "n": i })))
            .collect();
        records::write_records(store, entity, device, &batch)
            .await
            .unwrap();
    }

    fn service(
        local: &Arc<MemoryStore>,
        remote: &Arc<MockRemoteStore>,
    ) -> MigrationService {
        MigrationService::new(local.clone(), remote.clone(), "d1", 3)
    }

    #[tokio::test]
    async fn test_successful_run_migrates_everything() {
        let local = Arc::new(MemoryStore::new());
        let remote = Arc::new(MockRemoteStore::new());
        seed(&local, EntityType::WorkoutHistory, "d1", 4).await;
        seed(&local, EntityType::Measurements, "d1", 2).await;

        let svc = service(&local, &remote);
        let result = svc.perform_migration().await.unwrap();

        assert!(result.success);
        assert!(result.errors.is_empty());
        assert_eq!(result.total_migrated(), 6);
        assert_eq!(remote.stored_count(EntityType::WorkoutHistory, "d1").await, 4);
        assert!(matches!(svc.status(), StatusView::Completed { .. }));
    }

    #[tokio::test]
    async fn test_progress_reaches_final_step() {
        let local = Arc::new(MemoryStore::new());
        let remote = Arc::new(MockRemoteStore::new());
        seed(&local, EntityType::SocialPosts, "d1", 1).await;

        let svc = service(&local, &remote);
        let rx = svc.subscribe_progress();
        svc.perform_migration().await.unwrap();

        let last = rx.borrow().clone();
        assert_eq!(last.step, MigrationStep::Finalize);
        assert_eq!(last.progress, last.total);
    }

    #[tokio::test]
    async fn test_backup_failure_aborts_run() {
        let local = Arc::new(MemoryStore::new());
        let remote = Arc::new(MockRemoteStore::new());
        seed(&local, EntityType::WorkoutHistory, "d1", 1).await;
        local.poison();

        let svc = service(&local, &remote);
        assert!(svc.perform_migration().await.is_err());
        assert_eq!(remote.upsert_calls().await.len(), 0);
    }
}
