// ABOUTME: Backup manager snapshotting all local entity records before migration
// ABOUTME: Stores timestamped JSON snapshots in the local store with retention trimming
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

//! # Backup
//!
//! Step one of every migration run: snapshot every entity's records into a
//! single JSON document under `stride_backup_<device>_<timestamp>`. Backups
//! are also exposed directly (the app offered "create backup" as its own
//! action) along with listing and restore. Only the newest N snapshots are
//! kept per device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::models::{EntityType, LocalRecord};
use crate::store::{records, LocalStore};

/// Timestamp layout used in backup keys; lexicographic order equals
/// chronological order
const BACKUP_TS_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";

/// One backup snapshot as stored in the local store
#[derive(Debug, Serialize, Deserialize)]
struct BackupDocument {
    device_id: String,
    created_at: DateTime<Utc>,
    entities: BTreeMap<String, Vec<LocalRecord>>,
}

/// Metadata describing a stored backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    /// Local store key holding the snapshot
    pub key: String,
    /// When the snapshot was taken
    pub created_at: DateTime<Utc>,
    /// Total records across all entity types in the snapshot
    pub record_count: u64,
}

/// Creates, lists, and restores local data snapshots
pub struct BackupManager {
    store: Arc<dyn LocalStore>,
    retention: usize,
}

impl BackupManager {
    /// Create a backup manager keeping at most `retention` snapshots per device
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>, retention: usize) -> Self {
        Self { store, retention }
    }

    fn backup_prefix(device_id: &str) -> String {
        format!("{}_backup_{device_id}_", records::KEY_PREFIX)
    }

    /// Snapshot every entity's records for one device
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if any entity's records
    /// cannot be read or the snapshot cannot be written.
    pub async fn create_backup(&self, device_id: &str) -> AppResult<BackupInfo> {
        let created_at = Utc::now();
        let mut entities = BTreeMap::new();
        let mut record_count = 0u64;

        for entity in EntityType::ALL {
            let batch = records::read_records(self.store.as_ref(), entity, device_id).await?;
            record_count += batch.len() as u64;
            entities.insert(entity.as_str().to_owned(), batch);
        }

        let document = BackupDocument {
            device_id: device_id.to_owned(),
            created_at,
            entities,
        };

        let key = format!(
            "{}{}",
            Self::backup_prefix(device_id),
            created_at.format(BACKUP_TS_FORMAT)
        );
        let raw = serde_json::to_string(&document)
            .map_err(|e| AppError::serialization(format!("Failed to encode backup: {e}")))?;
        self.store.put(&key, &raw).await?;

        info!(
            device.id = %device_id,
            backup.key = %key,
            backup.records = record_count,
            "Backup created"
        );

        self.trim_old_backups(device_id).await?;

        Ok(BackupInfo {
            key,
            created_at,
            record_count,
        })
    }

    /// List stored backups for one device, oldest first
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if a snapshot cannot be read
    pub async fn list_backups(&self, device_id: &str) -> AppResult<Vec<BackupInfo>> {
        let keys = self.store.keys(&Self::backup_prefix(device_id)).await?;

        let mut backups = Vec::with_capacity(keys.len());
        for key in keys {
            let document = self.load_document(&key).await?;
            let record_count = document.entities.values().map(|v| v.len() as u64).sum();
            backups.push(BackupInfo {
                key,
                created_at: document.created_at,
                record_count,
            });
        }
        Ok(backups)
    }

    /// Restore a snapshot, replacing every entity's current records
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the key holds no backup, or a storage or
    /// serialization error if the restore fails partway.
    pub async fn restore_backup(&self, key: &str) -> AppResult<u64> {
        let document = self.load_document(key).await?;

        let mut restored = 0u64;
        for (name, batch) in &document.entities {
            let entity: EntityType = name.parse()?;
            restored += batch.len() as u64;
            records::write_records(self.store.as_ref(), entity, &document.device_id, batch)
                .await?;
        }

        info!(
            device.id = %document.device_id,
            backup.key = %key,
            backup.records = restored,
            "Backup restored"
        );
        Ok(restored)
    }

    async fn load_document(&self, key: &str) -> AppResult<BackupDocument> {
        let raw = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Backup {key}")))?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::serialization(format!("Corrupt backup under {key}: {e}")))
    }

    /// Delete snapshots beyond the retention limit, oldest first
    async fn trim_old_backups(&self, device_id: &str) -> AppResult<()> {
        let keys = self.store.keys(&Self::backup_prefix(device_id)).await?;
        if keys.len() <= self.retention {
            return Ok(());
        }

        let excess = keys.len() - self.retention;
        for key in &keys[..excess] {
            debug!(backup.key = %key, "Trimming old backup");
            self.store.delete(key).await?;
        }
        Ok(())
    }
}
