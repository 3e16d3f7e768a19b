// ABOUTME: Typed record layer over the raw key-value contract
// ABOUTME: Maps entity types to device-scoped keys and (de)serializes record arrays
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

//! Typed access to entity record arrays
//!
//! Each entity type's records live as one JSON array under a device-scoped
//! key, exactly the layout the mobile app left behind. A missing key means
//! the device never captured that entity type and reads back as an empty
//! list; a present-but-unparseable value is surfaced as a serialization
//! error, never collapsed into zero records.

use std::collections::HashSet;
use uuid::Uuid;

use super::LocalStore;
use crate::errors::{AppError, AppResult};
use crate::models::{EntityType, LocalRecord};

/// Prefix shared by all keys this crate owns in the local store
pub const KEY_PREFIX: &str = "stride";

/// Key under which one entity type's records are stored for one device
#[must_use]
pub fn key_for(entity: EntityType, device_id: &str) -> String {
    format!("{KEY_PREFIX}_{}_{device_id}", entity.as_str())
}

/// Read all records of one entity type for one device
///
/// # Errors
///
/// Returns a storage error if the store is unreadable, or a serialization
/// error if the stored value is not a valid record array.
pub async fn read_records(
    store: &dyn LocalStore,
    entity: EntityType,
    device_id: &str,
) -> AppResult<Vec<LocalRecord>> {
    let key = key_for(entity, device_id);
    let Some(raw) = store.get(&key).await? else {
        return Ok(Vec::new());
    };

    serde_json::from_str(&raw).map_err(|e| {
        AppError::serialization(format!("Corrupt record array under {key}: {e}"))
            .with_device_id(device_id)
            .with_entity(entity.as_str())
    })
}

/// Replace all records of one entity type for one device
///
/// # Errors
///
/// Returns a storage error if the write fails
pub async fn write_records(
    store: &dyn LocalStore,
    entity: EntityType,
    device_id: &str,
    records: &[LocalRecord],
) -> AppResult<()> {
    let key = key_for(entity, device_id);
    let raw = serde_json::to_string(records)
        .map_err(|e| AppError::serialization(format!("Failed to encode records for {key}: {e}")))?;
    store.put(&key, &raw).await
}

/// Flip the `migrated` flag on the given records and persist the array
///
/// Ids not present in the stored array are ignored; the store is written
/// once regardless of how many records matched.
///
/// # Errors
///
/// Returns a storage or serialization error if the read-modify-write fails
pub async fn mark_migrated(
    store: &dyn LocalStore,
    entity: EntityType,
    device_id: &str,
    ids: &[Uuid],
) -> AppResult<u64> {
    let mut records = read_records(store, entity, device_id).await?;
    let wanted: HashSet<Uuid> = ids.iter().copied().collect();

    let mut marked = 0u64;
    for record in &mut records {
        if wanted.contains(&record.id) && !record.migrated {
            record.migrated = true;
            marked += 1;
        }
    }

    if marked > 0 {
        write_records(store, entity, device_id, &records).await?;
    }
    Ok(marked)
}
