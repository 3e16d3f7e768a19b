// ABOUTME: Local store abstraction over the on-device key-value storage contract
// ABOUTME: Exposes the LocalStore trait plus sqlite, in-memory, and typed record layers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

//! # Local Store
//!
//! The on-device storage the mobile app wrote into: a key-value store with
//! device-scoped string keys holding JSON-serialized record arrays. The
//! [`LocalStore`] trait keeps that contract narrow so the sqlite
//! implementation and the in-memory test double are interchangeable
//! everywhere above this layer.

use async_trait::async_trait;

use crate::errors::AppResult;

/// Typed record layer over the raw key-value contract
pub mod records;

/// In-memory store for tests and dry runs
pub mod memory;

/// Sqlite-backed store, the production implementation
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// On-device key-value storage
///
/// Reads are non-mutating and safe to issue concurrently. Writes replace the
/// whole value for a key; there is no partial update at this layer.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Fetch the value stored under `key`, if any
    ///
    /// # Errors
    ///
    /// Returns a storage error if the underlying store is unreadable. A
    /// missing key is `Ok(None)`, never an error.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    async fn put(&self, key: &str, value: &str) -> AppResult<()>;

    /// Remove `key` and its value; removing an absent key is not an error
    ///
    /// # Errors
    ///
    /// Returns a storage error if the delete fails.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// List all keys starting with `prefix`, sorted ascending
    ///
    /// # Errors
    ///
    /// Returns a storage error if the underlying store is unreadable.
    async fn keys(&self, prefix: &str) -> AppResult<Vec<String>>;
}
