//! Mock storage for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{OpOutcome, StorageError, StorageResult, StoreOp, TokenStorage};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.expires_at.is_none_or(|at| at > Instant::now())
    }
}

/// In-process TTL store backed by a mutexed map.
#[derive(Debug, Default)]
pub struct MockStorage {
    entries: Mutex<HashMap<String, Entry>>,
    /// When set, every call fails with `Unavailable`.
    pub fail: std::sync::atomic::AtomicBool,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage that rejects every call.
    pub fn failing() -> Self {
        let storage = Self::default();
        storage
            .fail
            .store(true, std::sync::atomic::Ordering::SeqCst);
        storage
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StorageError::unavailable("mock storage offline"));
        }
        Ok(())
    }

    fn do_exists(entries: &HashMap<String, Entry>, key: &str) -> bool {
        entries.get(key).is_some_and(Entry::is_live)
    }

    fn do_delete(entries: &mut HashMap<String, Entry>, key: &str) -> u64 {
        match entries.remove(key) {
            Some(entry) if entry.is_live() => 1,
            _ => 0,
        }
    }
}

#[async_trait]
impl TokenStorage for MockStorage {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()> {
        self.check_available()?;
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.check_available()?;
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(key)
            .filter(|e| e.is_live())
            .map(|e| e.value.clone()))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.check_available()?;
        let entries = self.entries.lock().unwrap();
        Ok(Self::do_exists(&entries, key))
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<u64> {
        self.check_available()?;
        let mut entries = self.entries.lock().unwrap();
        Ok(keys.iter().map(|k| Self::do_delete(&mut entries, k)).sum())
    }

    async fn keys_matching(&self, pattern: &str) -> StorageResult<Vec<String>> {
        self.check_available()?;
        let entries = self.entries.lock().unwrap();
        let matches = |key: &str| match pattern.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => key == pattern,
        };
        Ok(entries
            .iter()
            .filter(|(k, e)| e.is_live() && matches(k))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn increment_with_window(&self, key: &str, window: Duration) -> StorageResult<i64> {
        self.check_available()?;
        let mut entries = self.entries.lock().unwrap();
        let count = match entries.get(key).filter(|e| e.is_live()) {
            Some(entry) => entry.value.parse::<i64>().unwrap_or(0) + 1,
            None => 1,
        };
        let expires_at = match entries.get(key).filter(|e| e.is_live()) {
            Some(entry) => entry.expires_at,
            None => Some(Instant::now() + window),
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
        self.check_available()?;
        let mut entries = self.entries.lock().unwrap();
        let mut outcomes = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                StoreOp::Exists { key } => {
                    let live = Self::do_exists(&entries, &key);
                    outcomes.push(OpOutcome::Exists(live));
                    if !live {
                        break;
                    }
                }
                StoreOp::Delete { key } => {
                    outcomes.push(OpOutcome::Deleted(Self::do_delete(&mut entries, &key)));
                }
                StoreOp::SetWithTtl { key, value, ttl } => {
                    entries.insert(
                        key,
                        Entry {
                            value,
                            expires_at: Some(Instant::now() + ttl),
                        },
                    );
                    outcomes.push(OpOutcome::Set);
                }
            }
        }
        Ok(outcomes)
    }
}
