//! Token lifecycle service.
//!
//! Owns every state transition a credential can make: issuance of paired
//! access/refresh tokens, one-time refresh rotation with a grace window for
//! racing clients, per-subject session caps, the blacklist, single-session
//! logout, and subject-wide revocation.
//!
//! All session state lives in [`TokenStorage`] with store-managed TTLs; the
//! service never sweeps anything itself.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::audit::{AuditAction, AuditRecord, AuditSink};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::storage::keys::{blacklist_key, grace_key, grace_pattern, session_key, session_pattern};
use crate::storage::{OpOutcome, StoreOp, TokenStorage};
use crate::token::jwt::{Claims, JwtService, TokenKind, Verification};
use crate::types::{OriginMetadata, Role, SubjectId};

// ============================================================================
// Pairs and Records
// ============================================================================

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    /// Short-lived bearer token.
    pub access_token: String,

    /// Long-lived rotation token.
    pub refresh_token: String,

    /// When the access token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,

    /// When the refresh token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_expires_at: OffsetDateTime,
}

/// The result of a successful rotation.
#[derive(Debug, Clone, Serialize)]
pub struct RotatedPair {
    /// The new credentials.
    #[serde(flatten)]
    pub pair: TokenPair,

    /// Set when the consumed refresh token was close to its own expiry; the
    /// client should plan a full re-login rather than rely on rotation.
    pub needs_renewal: bool,
}

/// Value stored under a session key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    /// Issuance time in Unix nanoseconds; cap eviction removes the smallest.
    /// Nanosecond precision keeps back-to-back issuances ordered.
    issued_at: i64,
}

// ============================================================================
// Token Service
// ============================================================================

/// Service for the full credential lifecycle.
///
/// Cheap to clone via the `Arc`s it holds; one instance is shared across the
/// authenticator, the failure tracker, and any login/logout handlers.
pub struct TokenService {
    jwt: Arc<JwtService>,
    storage: Arc<dyn TokenStorage>,
    audit: Arc<dyn AuditSink>,
    config: AuthConfig,
}

impl TokenService {
    /// Creates a lifecycle service.
    pub fn new(
        jwt: Arc<JwtService>,
        storage: Arc<dyn TokenStorage>,
        audit: Arc<dyn AuditSink>,
        config: AuthConfig,
    ) -> Self {
        Self {
            jwt,
            storage,
            audit,
            config,
        }
    }

    /// Returns the credential codec.
    #[must_use]
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Returns the subsystem configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    // ========================================================================
    // Issuance
    // ========================================================================

    /// Issues a new access/refresh pair for a subject.
    ///
    /// Enforces the per-subject refresh session cap first: when the subject
    /// is at the cap, the oldest refresh session (by issuance time) is
    /// deleted to make room. The evicted refresh token then fails rotation
    /// like any other consumed token.
    ///
    /// # Errors
    ///
    /// Returns `ServiceUnavailable` if the store cannot be reached.
    pub async fn issue(&self, sub: SubjectId, role: Role) -> Result<TokenPair, AuthError> {
        self.enforce_session_cap(sub).await?;

        let access = self.jwt.issue(
            sub,
            role,
            TokenKind::Access,
            as_signed(self.config.access_token_lifetime),
        )?;
        let refresh = self.jwt.issue(
            sub,
            role,
            TokenKind::Refresh,
            as_signed(self.config.refresh_token_lifetime),
        )?;

        let record = SessionRecord {
            issued_at: OffsetDateTime::now_utc().unix_timestamp_nanos() as i64,
        };
        let value = serde_json::to_string(&record)
            .map_err(|e| AuthError::service_unavailable(format!("Session encoding failed: {e}")))?;

        self.storage
            .set_with_ttl(
                &session_key(TokenKind::Access, sub, &access.claims.jti),
                &value,
                self.config.access_token_lifetime,
            )
            .await?;
        self.storage
            .set_with_ttl(
                &session_key(TokenKind::Refresh, sub, &refresh.claims.jti),
                &value,
                self.config.refresh_token_lifetime,
            )
            .await?;

        tracing::debug!(subject_id = sub, "issued token pair");

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            access_expires_at: access.claims.expires_at(),
            refresh_expires_at: refresh.claims.expires_at(),
        })
    }

    /// Deletes the oldest refresh sessions until one slot is free.
    async fn enforce_session_cap(&self, sub: SubjectId) -> Result<(), AuthError> {
        let keys = self
            .storage
            .keys_matching(&session_pattern(TokenKind::Refresh, sub))
            .await?;
        if keys.len() < self.config.max_sessions_per_user {
            return Ok(());
        }

        let mut aged: Vec<(String, i64)> = Vec::with_capacity(keys.len());
        for key in keys {
            let issued_at = match self.storage.get(&key).await? {
                Some(value) => serde_json::from_str::<SessionRecord>(&value)
                    .map(|r| r.issued_at)
                    // Unreadable records count as oldest and get evicted first.
                    .unwrap_or(i64::MIN),
                // Expired between the listing and the read.
                None => continue,
            };
            aged.push((key, issued_at));
        }

        if aged.len() < self.config.max_sessions_per_user {
            return Ok(());
        }

        aged.sort_by_key(|(_, issued_at)| *issued_at);
        let excess = aged.len() + 1 - self.config.max_sessions_per_user;
        let victims: Vec<String> = aged.into_iter().take(excess).map(|(k, _)| k).collect();
        let evicted = self.storage.delete(&victims).await?;

        tracing::debug!(subject_id = sub, evicted, "session cap reached, evicted oldest");
        Ok(())
    }

    // ========================================================================
    // Rotation
    // ========================================================================

    /// Exchanges a refresh token for a new pair, exactly once.
    ///
    /// The consume is a single atomic check-and-delete against the session
    /// record; a second rotation of the same token observes the missing
    /// record and fails with `TokenReused`. The consumed token id is left in
    /// a grace entry so a client that lost the race keeps its expired access
    /// token working for the grace window.
    ///
    /// An expired refresh token is allowed through verification here; its
    /// session record has already lapsed in the store, which rejects it with
    /// the same `TokenReused` outcome.
    ///
    /// # Errors
    ///
    /// `InvalidToken` for malformed input, `TokenReused` when the session
    /// was already consumed (replay, eviction, logout, or revocation),
    /// `RotationFailed` when any write after the consume fails, and
    /// `ServiceUnavailable` for store failures before the consume.
    pub async fn rotate(
        &self,
        refresh_token: &str,
        origin: OriginMetadata,
    ) -> Result<RotatedPair, AuthError> {
        let claims = match self.jwt.verify(refresh_token, TokenKind::Refresh) {
            Verification::Valid(claims) | Verification::Expired(claims) => claims,
            Verification::Malformed { message } => {
                return Err(AuthError::invalid_token(message));
            }
        };

        let session = session_key(TokenKind::Refresh, claims.sub, &claims.jti);
        let outcomes = self
            .storage
            .atomic(vec![
                StoreOp::Exists {
                    key: session.clone(),
                },
                StoreOp::Delete { key: session },
                StoreOp::SetWithTtl {
                    key: grace_key(claims.sub, &claims.jti),
                    value: "1".to_string(),
                    ttl: self.config.grace_window,
                },
            ])
            .await?;

        if outcomes.first() != Some(&OpOutcome::Exists(true)) {
            tracing::debug!(subject_id = claims.sub, "refresh token already consumed");
            return Err(AuthError::TokenReused);
        }

        let needs_renewal = claims.remaining_lifetime(OffsetDateTime::now_utc())
            < as_signed(self.config.grace_window);

        let pair = match self.issue(claims.sub, claims.role).await {
            Ok(pair) => pair,
            Err(e) => {
                // The old session is gone; make sure the consumed token
                // cannot come back even if the blacklist write also fails.
                if let Err(bl) = self.blacklist(&claims).await {
                    tracing::warn!(
                        subject_id = claims.sub,
                        error = %bl,
                        "failed to blacklist consumed refresh token"
                    );
                }
                tracing::warn!(subject_id = claims.sub, error = %e, "rotation failed after consume");
                return Err(AuthError::rotation_failed(e.to_string()));
            }
        };

        // The consume already happened; every later failure is a rotation
        // failure, whether issuance or the blacklist write broke.
        if let Err(e) = self.blacklist(&claims).await {
            tracing::warn!(subject_id = claims.sub, error = %e, "rotation failed after consume");
            return Err(AuthError::rotation_failed(e.to_string()));
        }

        self.audit
            .record(AuditRecord::new(
                claims.sub,
                AuditAction::TokenRotation,
                format!("refresh token {} consumed", claims.jti),
                origin,
            ))
            .await;

        Ok(RotatedPair {
            pair,
            needs_renewal,
        })
    }

    // ========================================================================
    // Revocation
    // ========================================================================

    /// Ends the session behind a single credential.
    ///
    /// Deletes its session record and blacklists its id for the remaining
    /// lifetime, then records a `LOGOUT` audit event.
    ///
    /// # Errors
    ///
    /// Returns `ServiceUnavailable` if the store cannot be reached.
    pub async fn logout(
        &self,
        claims: &Claims,
        origin: OriginMetadata,
    ) -> Result<(), AuthError> {
        self.storage
            .delete(&[session_key(claims.kind, claims.sub, &claims.jti)])
            .await?;
        self.blacklist(claims).await?;

        self.audit
            .record(AuditRecord::new(
                claims.sub,
                AuditAction::Logout,
                format!("{} session ended", claims.kind),
                origin,
            ))
            .await;

        Ok(())
    }

    /// Revokes every live session for a subject.
    ///
    /// Deletes all access and refresh session records and all grace entries,
    /// so neither a live token nor a recently consumed one can pass the
    /// authenticator afterwards. Returns the number of records removed.
    ///
    /// # Errors
    ///
    /// Returns `ServiceUnavailable` if the store cannot be reached.
    pub async fn revoke_all(&self, sub: SubjectId) -> Result<u64, AuthError> {
        let mut keys = self
            .storage
            .keys_matching(&session_pattern(TokenKind::Access, sub))
            .await?;
        keys.extend(
            self.storage
                .keys_matching(&session_pattern(TokenKind::Refresh, sub))
                .await?,
        );
        keys.extend(self.storage.keys_matching(&grace_pattern(sub)).await?);

        let revoked = self.storage.delete(&keys).await?;
        tracing::warn!(subject_id = sub, revoked, "revoked all sessions");
        Ok(revoked)
    }

    /// Returns `true` if the token id is on the blacklist.
    ///
    /// # Errors
    ///
    /// Returns `ServiceUnavailable` if the store cannot be reached; callers
    /// must treat that as a failure, never as "not blacklisted".
    pub async fn is_blacklisted(&self, jti: &str) -> Result<bool, AuthError> {
        Ok(self.storage.exists(&blacklist_key(jti)).await?)
    }

    /// Returns `true` if a live session record exists for the claims.
    ///
    /// # Errors
    ///
    /// Returns `ServiceUnavailable` if the store cannot be reached.
    pub async fn has_active_session(&self, claims: &Claims) -> Result<bool, AuthError> {
        Ok(self
            .storage
            .exists(&session_key(claims.kind, claims.sub, &claims.jti))
            .await?)
    }

    /// Returns `true` if a grace entry exists for a consumed refresh token.
    ///
    /// # Errors
    ///
    /// Returns `ServiceUnavailable` if the store cannot be reached.
    pub async fn in_grace_window(&self, sub: SubjectId, jti: &str) -> Result<bool, AuthError> {
        Ok(self.storage.exists(&grace_key(sub, jti)).await?)
    }

    /// Blacklists a token id for its remaining lifetime.
    ///
    /// A token already past its expiry needs no entry; the codec rejects it
    /// on expiry alone from then on.
    async fn blacklist(&self, claims: &Claims) -> Result<(), AuthError> {
        let remaining = claims.remaining_lifetime(OffsetDateTime::now_utc());
        if remaining.is_positive() {
            self.storage
                .set_with_ttl(&blacklist_key(&claims.jti), "1", remaining.unsigned_abs())
                .await?;
        }
        Ok(())
    }
}

/// Converts a configured lifetime into the codec's signed duration.
fn as_signed(d: std::time::Duration) -> time::Duration {
    time::Duration::try_from(d).unwrap_or(time::Duration::MAX)
}

// ============================================================================
// Tests
// ============================================================================
