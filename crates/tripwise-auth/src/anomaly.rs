//! Failed-authentication anomaly tracking.
//!
//! Counts authentication failures per subject in a fixed TTL window. When
//! the count reaches the configured threshold, every session for the subject
//! is revoked and an `AUTO_REVOKE` audit record is written. The counter
//! itself expires with the window, so quiet subjects cost nothing.

use std::sync::Arc;

use crate::audit::{AuditAction, AuditRecord, AuditSink};
use crate::config::AnomalyConfig;
use crate::error::AuthError;
use crate::storage::keys::failure_key;
use crate::storage::TokenStorage;
use crate::token::TokenService;
use crate::types::{OriginMetadata, SubjectId};

/// Tracks authentication failures and triggers mass revocation.
pub struct FailureTracker {
    storage: Arc<dyn TokenStorage>,
    tokens: Arc<TokenService>,
    audit: Arc<dyn AuditSink>,
    config: AnomalyConfig,
}

impl FailureTracker {
    /// Creates a failure tracker.
    pub fn new(
        storage: Arc<dyn TokenStorage>,
        tokens: Arc<TokenService>,
        audit: Arc<dyn AuditSink>,
        config: AnomalyConfig,
    ) -> Self {
        Self {
            storage,
            tokens,
            audit,
            config,
        }
    }

    /// Records one authentication failure for a subject.
    ///
    /// Returns `true` if this failure tripped the threshold and the
    /// subject's sessions were revoked. The counter window is fixed: it
    /// starts at the first failure and is not extended by later ones, so a
    /// slow trickle of failures resets cleanly instead of accumulating
    /// forever.
    ///
    /// # Errors
    ///
    /// Returns `ServiceUnavailable` if the store cannot be reached.
    pub async fn record_failure(
        &self,
        sub: SubjectId,
        origin: OriginMetadata,
    ) -> Result<bool, AuthError> {
        let key = failure_key(sub);
        let count = self
            .storage
            .increment_with_window(&key, self.config.failure_window)
            .await?;

        if count < i64::from(self.config.failure_threshold) {
            tracing::debug!(subject_id = sub, count, "authentication failure recorded");
            return Ok(false);
        }

        tracing::warn!(
            subject_id = sub,
            count,
            threshold = self.config.failure_threshold,
            "failure threshold reached, revoking all sessions"
        );

        let revoked = self.tokens.revoke_all(sub).await?;
        self.storage.delete(&[key]).await?;

        self.audit
            .record(AuditRecord::new(
                sub,
                AuditAction::AutoRevoke,
                format!(
                    "{count} authentication failures in window, {revoked} sessions revoked"
                ),
                origin,
            ))
            .await;

        Ok(true)
    }
}
