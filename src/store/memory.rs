// ABOUTME: In-memory implementation of the on-device key-value store
// ABOUTME: Used by tests and CLI dry runs; also supports failure injection for corruption tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::LocalStore;
use crate::errors::{AppError, AppResult};

/// In-memory key-value store
///
/// A `BTreeMap` behind an async lock, so `keys()` comes back sorted like the
/// sqlite implementation. `poison()` makes every subsequent read fail, which
/// is how tests simulate unreadable device storage.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
    poisoned: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail with a storage error
    pub fn poison(&self) {
        self.poisoned.store(true, Ordering::SeqCst);
    }

    fn check_readable(&self) -> AppResult<()> {
        if self.poisoned.load(Ordering::SeqCst) {
            return Err(AppError::storage("Local store is unreadable"));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.check_readable()?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> AppResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        self.check_readable()?;
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
