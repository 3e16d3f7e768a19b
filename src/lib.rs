// ABOUTME: Main library entry point for the Stride sync service
// ABOUTME: Migrates on-device fitness records into the hosted backend with partial-failure reporting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

#![deny(unsafe_code)]

//! # Stride Sync
//!
//! Local-to-cloud migration service for the Stride fitness app. Devices
//! accumulate workout history, achievements, measurements, progress photos,
//! and social posts in an on-device key-value store; this crate moves those
//! records into the hosted backend, once per device, with per-entity
//! partial-failure reporting and safe retries.
//!
//! ## Architecture
//!
//! - **Store**: the on-device key-value contract (`sqlite` in production,
//!   in-memory for tests) plus a typed record layer
//! - **Remote**: the hosted backend's row-based CRUD surface behind a trait
//! - **Summary**: per-entity local/remote counts, idempotent and
//!   side-effect free
//! - **Backup**: pre-migration snapshots with retention
//! - **Migration**: the orchestrator sequencing backup, per-entity
//!   transfer, and status finalization
//! - **Status**: the read-only projection consumers render
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stride_sync::migration::MigrationService;
//! use stride_sync::remote::MockRemoteStore;
//! use stride_sync::store::MemoryStore;
//!
//! # async fn example() -> stride_sync::errors::AppResult<()> {
//! let local = Arc::new(MemoryStore::new());
//! let remote = Arc::new(MockRemoteStore::new());
//! let service = MigrationService::new(local, remote, "device-1", 3);
//!
//! let result = service.perform_migration().await?;
//! println!("migrated {} records", result.total_migrated());
//! # Ok(())
//! # }
//! ```

/// Pre-migration snapshots of local data with retention
pub mod backup;

/// Environment-based configuration management
pub mod config;

/// Unified error handling system with standard error codes
pub mod errors;

/// Structured logging configuration
pub mod logging;

/// Migration orchestration with partial-failure isolation
pub mod migration;

/// Common data models shared across the flow
pub mod models;

/// Remote backend access behind the `RemoteStore` trait
pub mod remote;

/// Migration status tracking and the presenter projection
pub mod status;

/// On-device key-value storage and the typed record layer
pub mod store;

/// Per-entity local and remote record counts
pub mod summary;
