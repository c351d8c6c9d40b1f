//! Token storage trait.
//!
//! The subsystem keeps all mutable session state in a TTL key-value store
//! behind this trait: session records, the blacklist, grace windows, and
//! failure counters. Every record's lifetime is store-managed, so nothing
//! here needs a background sweep job.
//!
//! # Implementations
//!
//! Storage implementations are provided in separate crates:
//!
//! - `tripwise-auth-memory` - in-memory backend (tests, single-node dev)
//!
//! # Concurrency
//!
//! [`TokenStorage::atomic`] is the only synchronization primitive the
//! subsystem relies on. Simple reads ([`TokenStorage::exists`],
//! [`TokenStorage::get`]) may race freely; the worst case is an extra
//! rejected request.

pub mod keys;
#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;

use async_trait::async_trait;

/// Errors produced by a storage backend.
///
/// Backends never report "not found" as an error; absence is encoded in the
/// method return types. An error always means the store itself failed, and
/// callers surface it as [`crate::AuthError::ServiceUnavailable`], never as
/// a silent miss.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend could not be reached or timed out.
    #[error("Storage unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The backend returned data the subsystem cannot interpret.
    #[error("Corrupt storage entry: {message}")]
    Corrupt {
        /// Description of the bad entry.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Corrupt` error.
    #[must_use]
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}

impl From<StorageError> for crate::error::AuthError {
    fn from(err: StorageError) -> Self {
        Self::ServiceUnavailable {
            message: err.to_string(),
        }
    }
}

/// Type alias for storage operation results.
pub type StorageResult<T> = Result<T, StorageError>;

/// A single operation inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Check whether a key is live.
    Exists {
        /// The key to check.
        key: String,
    },
    /// Delete a key.
    Delete {
        /// The key to delete.
        key: String,
    },
    /// Write a key with a time-to-live.
    SetWithTtl {
        /// The key to write.
        key: String,
        /// The value to store.
        value: String,
        /// Lifetime of the entry.
        ttl: Duration,
    },
}

/// The outcome of a single batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpOutcome {
    /// Result of an `Exists` op.
    Exists(bool),
    /// Number of keys removed by a `Delete` op.
    Deleted(u64),
    /// A `SetWithTtl` op completed.
    Set,
}

/// TTL key-value storage for token/session state.
///
/// Every call is a blocking I/O boundary in a real deployment; none may be
/// assumed instantaneous.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Writes a key with a time-to-live. Overwrites any existing entry and
    /// resets its TTL.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()>;

    /// Returns the live value for a key, or `None` if absent or expired.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Returns `true` if the key is live.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Deletes the given keys. Missing keys are ignored.
    ///
    /// Returns the number of keys actually removed.
    async fn delete(&self, keys: &[String]) -> StorageResult<u64>;

    /// Lists live keys matching a pattern.
    ///
    /// Only trailing-`*` prefix patterns are supported (`session:refresh:42:*`);
    /// a pattern without `*` matches exactly one key.
    async fn keys_matching(&self, pattern: &str) -> StorageResult<Vec<String>>;

    /// Increments an integer counter, creating it with the window TTL if
    /// absent.
    ///
    /// This is a fixed window: the TTL is set only on creation and is not
    /// extended by later increments. Returns the post-increment count.
    async fn increment_with_window(&self, key: &str, window: Duration) -> StorageResult<i64>;

    /// Executes a batch of operations under a single guard, in order.
    ///
    /// If an [`StoreOp::Exists`] op observes a missing key, the remaining
    /// ops are skipped and the partial outcome list is returned. This makes
    /// `[Exists, Delete, SetWithTtl]` a check-and-consume transaction: the
    /// rotation protocol depends on it to reject concurrent consumption of
    /// the same refresh session.
    async fn atomic(&self, ops: Vec<StoreOp>) -> StorageResult<Vec<OpOutcome>>;
}
