//! Security audit trail.
//!
//! Lifecycle-significant events (rotations, mass revocations, logouts) are
//! pushed through an [`AuditSink`]. The sink is infallible by design: an
//! audit failure must never block a rotation or revocation, so sinks absorb
//! their own errors and log them.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::types::{OriginMetadata, SubjectId};

// ============================================================================
// Audit Records
// ============================================================================

/// Actions recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    /// A refresh token was exchanged for a new pair.
    TokenRotation,
    /// All sessions for a subject were revoked by the anomaly tracker.
    AutoRevoke,
    /// A single session was ended at the client's request.
    Logout,
}

impl AuditAction {
    /// Returns the action name as written to the audit trail.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenRotation => "TOKEN_ROTATION",
            Self::AutoRevoke => "AUTO_REVOKE",
            Self::Logout => "LOGOUT",
        }
    }
}

/// A single audit trail entry.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// The subject the event concerns.
    pub subject_id: SubjectId,

    /// What happened.
    pub action: AuditAction,

    /// Free-form detail ("rotated jti abc -> def", "threshold 5 reached").
    pub details: String,

    /// Request origin, when the event was client-initiated.
    pub origin: OriginMetadata,

    /// When the event occurred.
    pub timestamp: OffsetDateTime,
}

impl AuditRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(
        subject_id: SubjectId,
        action: AuditAction,
        details: impl Into<String>,
        origin: OriginMetadata,
    ) -> Self {
        Self {
            subject_id,
            action,
            details: details.into(),
            origin,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

// ============================================================================
// Audit Sink
// ============================================================================

/// Destination for audit records.
///
/// Implementations must not fail the caller; persist-or-log is their own
/// problem.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    async fn record(&self, record: AuditRecord);
}

/// Audit sink that emits records as structured log events.
///
/// The default sink for deployments without a dedicated audit table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: AuditRecord) {
        tracing::info!(
            subject_id = record.subject_id,
            action = record.action.as_str(),
            details = %record.details,
            ip = record.origin.ip.as_deref().unwrap_or("-"),
            user_agent = record.origin.user_agent.as_deref().unwrap_or("-"),
            "audit event"
        );
    }
}
