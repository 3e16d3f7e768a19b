// ABOUTME: Migration status tracking and the read-only presenter projection
// ABOUTME: Persists MigrationStatus per device and publishes StatusView over a watch channel
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

//! # Status Presenter
//!
//! A read-only projection of migration state for consumers that render it.
//! The tracker itself never transitions state: `mark_completed` is called by
//! the orchestrator after a fully successful run, and `refresh` merely
//! recomputes the projection from the persisted status and the current local
//! counts. Consumers subscribe to a watch channel instead of polling.
//!
//! State machine: `Unknown -> {Completed | Required} -> Migrating ->
//! {Completed | Required(retry)}`. `Completed` is terminal; `Required` is
//! re-enterable after a failed attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::errors::{AppError, AppResult};
use crate::models::MigrationStatus;
use crate::store::{records, LocalStore};

/// Renderable projection of the migration state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusView {
    /// Status has not been read yet
    Loading,
    /// Local data exists that has not been migrated
    Required {
        /// Total on-device records awaiting migration
        local_records: u64,
    },
    /// No local data and no completed migration; nothing to render
    NotRequired,
    /// A migration run finished successfully
    Completed {
        /// When the run finished
        completed_at: Option<DateTime<Utc>>,
    },
}

/// Persists per-device [`MigrationStatus`] and publishes [`StatusView`] updates
pub struct StatusTracker {
    store: Arc<dyn LocalStore>,
    device_id: String,
    tx: watch::Sender<StatusView>,
}

impl StatusTracker {
    /// Create a tracker for one device; the initial view is `Loading`
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>, device_id: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(StatusView::Loading);
        Self {
            store,
            device_id: device_id.into(),
            tx,
        }
    }

    fn status_key(&self) -> String {
        format!(
            "{}_migration_status_{}",
            records::KEY_PREFIX,
            self.device_id
        )
    }

    /// Read the persisted status; a device never migrated reads as default
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store is unreadable, or a
    /// serialization error if the persisted status is corrupt.
    pub async fn load(&self) -> AppResult<MigrationStatus> {
        let Some(raw) = self.store.get(&self.status_key()).await? else {
            return Ok(MigrationStatus::default());
        };
        serde_json::from_str(&raw).map_err(|e| {
            AppError::serialization(format!("Corrupt migration status: {e}"))
                .with_device_id(self.device_id.clone())
        })
    }

    /// Persist a completed status; called only after a fully successful run
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if the write fails
    pub async fn mark_completed(&self, at: DateTime<Utc>) -> AppResult<MigrationStatus> {
        let status = MigrationStatus::completed(at);
        let raw = serde_json::to_string(&status)
            .map_err(|e| AppError::serialization(format!("Failed to encode status: {e}")))?;
        self.store.put(&self.status_key(), &raw).await?;

        self.tx.send_replace(StatusView::Completed {
            completed_at: status.completed_at,
        });
        Ok(status)
    }

    /// Recompute the projection from the persisted status and local counts
    ///
    /// A migration is required only while local records exist and no
    /// completed-migration record exists for this device.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if the persisted status
    /// cannot be read.
    pub async fn refresh(&self, total_local_records: u64) -> AppResult<StatusView> {
        let status = self.load().await?;

        let view = if status.is_completed {
            StatusView::Completed {
                completed_at: status.completed_at,
            }
        } else if total_local_records > 0 {
            StatusView::Required {
                local_records: total_local_records,
            }
        } else {
            StatusView::NotRequired
        };

        self.tx.send_replace(view.clone());
        Ok(view)
    }

    /// Current projection without recomputing
    #[must_use]
    pub fn view(&self) -> StatusView {
        self.tx.borrow().clone()
    }

    /// Subscribe to projection changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_initial_view_is_loading() {
        let tracker = StatusTracker::new(Arc::new(MemoryStore::new()), "d1");
        assert_eq!(tracker.view(), StatusView::Loading);
    }

    #[tokio::test]
    async fn test_refresh_with_local_data_is_required() {
        let tracker = StatusTracker::new(Arc::new(MemoryStore::new()), "d1");
        let view = tracker.refresh(20).await.unwrap();
        assert_eq!(view, StatusView::Required { local_records: 20 });
        assert_eq!(tracker.view(), view);
    }

    #[tokio::test]
    async fn test_refresh_without_data_is_not_required() {
        let tracker = StatusTracker::new(Arc::new(MemoryStore::new()), "d1");
        let view = tracker.refresh(0).await.unwrap();
        assert_eq!(view, StatusView::NotRequired);
    }

    #[tokio::test]
    async fn test_completed_wins_over_local_counts() {
        let store = Arc::new(MemoryStore::new());
        let tracker = StatusTracker::new(store.clone(), "d1");

        let status = tracker.mark_completed(Utc::now()).await.unwrap();
        assert!(status.is_completed);
        assert!(!status.is_required);

        // Even with leftover local records, a completed device stays completed
        let view = tracker.refresh(7).await.unwrap();
        assert!(matches!(view, StatusView::Completed { .. }));

        // A fresh tracker over the same store sees the persisted status
        let reloaded = StatusTracker::new(store, "d1").load().await.unwrap();
        assert!(reloaded.is_completed);
    }

    #[tokio::test]
    async fn test_subscribe_observes_transitions() {
        let tracker = StatusTracker::new(Arc::new(MemoryStore::new()), "d1");
        let mut rx = tracker.subscribe();

        tracker.refresh(3).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), StatusView::Required { local_records: 3 });
    }
}
