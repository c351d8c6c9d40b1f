//! In-memory token storage backend for the Tripwise auth subsystem.
//!
//! This crate provides an in-memory implementation of the `TokenStorage`
//! trait from `tripwise-auth`, suitable for tests and single-node
//! development. Entries expire lazily: an expired entry is invisible to
//! every read and is dropped the next time it is touched.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tripwise_auth::TokenStorage;
//! use tripwise_auth_memory::InMemoryTokenStorage;
//!
//! let storage = InMemoryTokenStorage::new();
//! storage.set_with_ttl("session:access:42:abc", "{}", Duration::from_secs(900)).await?;
//! assert!(storage.exists("session:access:42:abc").await?);
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use tripwise_auth::{OpOutcome, StorageResult, StoreOp, TokenStorage};

/// A stored value with its expiry deadline.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory TTL key-value store.
///
/// A single async mutex over a `BTreeMap` serializes every operation, which
/// trivially satisfies the atomic-batch contract. Fine for tests and dev;
/// a production deployment plugs in a store with real multi-key atomicity.
#[derive(Debug, Default)]
pub struct InMemoryTokenStorage {
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl InMemoryTokenStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| e.is_live(now)).count()
    }

    /// Returns `true` when no live entries exist.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn matches(pattern: &str, key: &str) -> bool {
        match pattern.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => key == pattern,
        }
    }

    fn remove_if_live(entries: &mut BTreeMap<String, Entry>, key: &str, now: Instant) -> bool {
        match entries.remove(key) {
            Some(entry) => entry.is_live(now),
            None => false,
        }
    }
}

#[async_trait]
impl TokenStorage for InMemoryTokenStorage {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        Ok(keys
            .iter()
            .filter(|k| Self::remove_if_live(&mut entries, k, now))
            .count() as u64)
    }

    async fn keys_matching(&self, pattern: &str) -> StorageResult<Vec<String>> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .filter(|(k, e)| e.is_live(now) && Self::matches(pattern, k))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn increment_with_window(&self, key: &str, window: Duration) -> StorageResult<i64> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let (count, expires_at) = match entries.get(key) {
            Some(entry) if entry.is_live(now) => (
                entry.value.parse::<i64>().unwrap_or(0) + 1,
                // Fixed window: the deadline set at creation stands.
                entry.expires_at,
            ),
            _ => (1, now + window),
        };
        entries.insert(
            key.to_string(),
            Entry {
                value: count.to_string(),
                expires_at,
            },
        );
        Ok(count)
    }

    async fn atomic(&self, ops: Vec<StoreOp>) -> StorageResult<Vec<OpOutcome>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let mut outcomes = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                StoreOp::Exists { key } => {
                    let live = entries.get(&key).is_some_and(|e| e.is_live(now));
                    outcomes.push(OpOutcome::Exists(live));
                    // A failed guard aborts the rest of the batch.
                    if !live {
                        break;
                    }
                }
                StoreOp::Delete { key } => {
                    let removed = u64::from(Self::remove_if_live(&mut entries, &key, now));
                    outcomes.push(OpOutcome::Deleted(removed));
                }
                StoreOp::SetWithTtl { key, value, ttl } => {
                    entries.insert(
                        key,
                        Entry {
                            value,
                            expires_at: now + ttl,
                        },
                    );
                    outcomes.push(OpOutcome::Set);
                }
            }
        }
        Ok(outcomes)
    }
}
