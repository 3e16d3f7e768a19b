// ABOUTME: Core data models for the Stride sync service
// ABOUTME: Defines EntityType, LocalRecord, DataSummary, MigrationStatus and migration results
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

//! # Data Models
//!
//! Common data structures shared across the summary reader, the migration
//! orchestrator, and the status presenter. All types are serde-serializable
//! because they either live in the local key-value store as JSON or cross
//! the wire to the remote backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::AppError;

/// The categories of user data tracked independently during migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Completed workout sessions
    WorkoutHistory,
    /// Unlocked achievements
    UserAchievements,
    /// Body measurements (weight, body fat, girths)
    Measurements,
    /// Progress photo metadata
    ProgressPhotos,
    /// Posts authored for the social feed
    SocialPosts,
}

impl EntityType {
    /// All tracked entity types, in migration order
    pub const ALL: [EntityType; 5] = [
        EntityType::WorkoutHistory,
        EntityType::UserAchievements,
        EntityType::Measurements,
        EntityType::ProgressPhotos,
        EntityType::SocialPosts,
    ];

    /// Canonical string form, matching the local store key segments
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityType::WorkoutHistory => "workout_history",
            EntityType::UserAchievements => "user_achievements",
            EntityType::Measurements => "measurements",
            EntityType::ProgressPhotos => "progress_photos",
            EntityType::SocialPosts => "social_posts",
        }
    }

    /// Remote backend table this entity type migrates into
    pub const fn table_name(self) -> &'static str {
        match self {
            EntityType::WorkoutHistory => "workouts",
            EntityType::UserAchievements => "achievements",
            EntityType::Measurements => "measurements",
            EntityType::ProgressPhotos => "progress_photos",
            EntityType::SocialPosts => "social_posts",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workout_history" => Ok(EntityType::WorkoutHistory),
            "user_achievements" => Ok(EntityType::UserAchievements),
            "measurements" => Ok(EntityType::Measurements),
            "progress_photos" => Ok(EntityType::ProgressPhotos),
            "social_posts" => Ok(EntityType::SocialPosts),
            other => Err(AppError::invalid_input(format!(
                "Unknown entity type: {other}"
            ))),
        }
    }
}

/// A single on-device record awaiting migration
///
/// The `id` is assigned on-device at creation time and never changes; the
/// remote store upserts on it, so re-sending a record is harmless. The
/// `migrated` flag is flipped locally once the remote store has accepted the
/// record, letting retries skip work that already landed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalRecord {
    /// Stable device-assigned identifier, the upsert key on the remote side
    pub id: Uuid,
    /// Entity payload as captured by the app (schema owned by the backend)
    pub payload: serde_json::Value,
    /// When the record was captured on-device
    pub recorded_at: DateTime<Utc>,
    /// Whether this record has been accepted by the remote store
    #[serde(default)]
    pub migrated: bool,
}

impl LocalRecord {
    /// Create a fresh, unmigrated record
    #[must_use]
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            recorded_at: Utc::now(),
            migrated: false,
        }
    }
}

/// Per-entity record counts on one side of the migration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub workouts: u64,
    pub achievements: u64,
    pub measurements: u64,
    pub photos: u64,
    pub social: u64,
}

impl EntityCounts {
    /// Read the count for one entity type
    pub const fn get(&self, entity: EntityType) -> u64 {
        match entity {
            EntityType::WorkoutHistory => self.workouts,
            EntityType::UserAchievements => self.achievements,
            EntityType::Measurements => self.measurements,
            EntityType::ProgressPhotos => self.photos,
            EntityType::SocialPosts => self.social,
        }
    }

    /// Set the count for one entity type
    pub fn set(&mut self, entity: EntityType, count: u64) {
        match entity {
            EntityType::WorkoutHistory => self.workouts = count,
            EntityType::UserAchievements => self.achievements = count,
            EntityType::Measurements => self.measurements = count,
            EntityType::ProgressPhotos => self.photos = count,
            EntityType::SocialPosts => self.social = count,
        }
    }

    /// Total records across all entity types
    pub fn total(&self) -> u64 {
        self.workouts + self.achievements + self.measurements + self.photos + self.social
    }
}

/// Snapshot of local and remote record counts for one device
///
/// Recomputed on demand by the summary reader; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSummary {
    /// Counts present in the on-device store
    pub local: EntityCounts,
    /// Counts already present in the remote store
    pub remote: EntityCounts,
}

impl DataSummary {
    /// Total on-device records across all entity types
    pub fn total_local(&self) -> u64 {
        self.local.total()
    }

    /// Total remote records across all entity types
    pub fn total_remote(&self) -> u64 {
        self.remote.total()
    }
}

/// Persistent migration state for one device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatus {
    /// Local data exists and has not been migrated
    pub is_required: bool,
    /// A migration run finished with every entity type succeeding
    pub is_completed: bool,
    /// When the successful run finished
    pub completed_at: Option<DateTime<Utc>>,
}

impl MigrationStatus {
    /// Status after a fully successful migration run
    #[must_use]
    pub fn completed(at: DateTime<Utc>) -> Self {
        Self {
            is_required: false,
            is_completed: true,
            completed_at: Some(at),
        }
    }

    /// Status for a device that still holds unmigrated data
    #[must_use]
    pub const fn required() -> Self {
        Self {
            is_required: true,
            is_completed: false,
            completed_at: None,
        }
    }
}

/// The step a running migration is currently executing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStep {
    /// Snapshotting local data before any transfer
    Backup,
    /// Transferring one entity type
    Transfer(EntityType),
    /// Persisting the final status
    Finalize,
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStep::Backup => f.write_str("backup"),
            MigrationStep::Transfer(entity) => write!(f, "transfer:{entity}"),
            MigrationStep::Finalize => f.write_str("finalize"),
        }
    }
}

/// Ephemeral progress emitted while a migration run is in flight
///
/// Published over a watch channel; discarded after completion or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationProgress {
    /// Step currently executing
    pub step: MigrationStep,
    /// Steps finished so far
    pub progress: u32,
    /// Total steps in this run
    pub total: u32,
}

impl MigrationProgress {
    /// Progress value for a run that has not started
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            step: MigrationStep::Backup,
            progress: 0,
            total: 0,
        }
    }
}

/// Outcome of migrating a single entity type within one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityOutcome {
    /// The entity type this outcome describes
    pub entity: EntityType,
    /// Records accepted by the remote store during this run
    pub migrated: u64,
    /// Records skipped because a previous run already migrated them
    pub skipped: u64,
    /// Failure message if this entity type's transfer failed
    pub error: Option<String>,
}

impl EntityOutcome {
    /// Whether this entity type's transfer succeeded
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of one migration attempt, surfaced to the caller and not persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// True only if every entity type transferred without error
    pub success: bool,
    /// Per-entity outcomes, one per tracked entity type, in migration order
    pub outcomes: Vec<EntityOutcome>,
    /// Flat list of failure messages, one per failed entity type
    pub errors: Vec<String>,
    /// When this attempt finished
    pub completed_at: DateTime<Utc>,
}

impl MigrationResult {
    /// Records migrated for one entity type during this attempt
    pub fn migrated_count(&self, entity: EntityType) -> u64 {
        self.outcomes
            .iter()
            .find(|o| o.entity == entity)
            .map_or(0, |o| o.migrated)
    }

    /// Records migrated across all entity types during this attempt
    pub fn total_migrated(&self) -> u64 {
        self.outcomes.iter().map(|o| o.migrated).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_round_trip() {
        for entity in EntityType::ALL {
            let parsed: EntityType = entity.as_str().parse().unwrap();
            assert_eq!(parsed, entity);
        }
        assert!("nutrition_log".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_entity_counts_total() {
        let mut counts = EntityCounts::default();
        counts.set(EntityType::WorkoutHistory, 12);
        counts.set(EntityType::UserAchievements, 3);
        counts.set(EntityType::SocialPosts, 5);

        assert_eq!(counts.get(EntityType::WorkoutHistory), 12);
        assert_eq!(counts.get(EntityType::Measurements), 0);
        assert_eq!(counts.total(), 20);
    }

    #[test]
    fn test_migration_status_constructors() {
        let required = MigrationStatus::required();
        assert!(required.is_required);
        assert!(!required.is_completed);

        let done = MigrationStatus::completed(Utc::now());
        assert!(!done.is_required);
        assert!(done.is_completed);
        assert!(done.completed_at.is_some());
    }

    #[test]
    fn test_local_record_defaults_unmigrated() {
        let record = LocalRecord::new(serde_json::json!({"exercise": "deadlift"}));
        assert!(!record.migrated);

        // Records serialized before the migrated flag existed deserialize as unmigrated
        let legacy = serde_json::json!({
            "id": Uuid::new_v4(),
            "payload": {},
            "recorded_at": Utc::now(),
        });
        let parsed: LocalRecord = serde_json::from_value(legacy).unwrap();
        assert!(!parsed.migrated);
    }

    #[test]
    fn test_migration_result_counts() {
        let result = MigrationResult {
            success: false,
            outcomes: vec![
                EntityOutcome {
                    entity: EntityType::WorkoutHistory,
                    migrated: 12,
                    skipped: 0,
                    error: None,
                },
                EntityOutcome {
                    entity: EntityType::SocialPosts,
                    migrated: 0,
                    skipped: 0,
                    error: Some("backend returned 503".into()),
                },
            ],
            errors: vec!["social_posts: backend returned 503".into()],
            completed_at: Utc::now(),
        };

        assert_eq!(result.migrated_count(EntityType::WorkoutHistory), 12);
        assert_eq!(result.migrated_count(EntityType::SocialPosts), 0);
        assert_eq!(result.total_migrated(), 12);
    }
}
