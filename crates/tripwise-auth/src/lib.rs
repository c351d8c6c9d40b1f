//! # tripwise-auth
//!
//! Token and session lifecycle management for the Tripwise server.
//!
//! This crate provides:
//! - Signed, expiring JWT credentials in paired kinds (access/refresh)
//! - One-time refresh rotation with a grace window for racing clients
//! - Per-subject session caps with oldest-first eviction
//! - Blacklist-backed revocation and single-session logout
//! - Failed-authentication anomaly tracking with automatic mass revocation
//! - A per-request authentication state machine and Axum extractor
//!
//! ## Overview
//!
//! All mutable session state lives in a TTL key-value store behind the
//! [`storage::TokenStorage`] trait; records expire with the credentials they
//! track, so nothing needs a background sweep. The store's atomic batch is
//! the only synchronization primitive in the crate, which keeps the service
//! stateless and horizontally scalable.
//!
//! ## Modules
//!
//! - [`config`] - Lifetimes, caps, anomaly thresholds, signing secrets
//! - [`token`] - Credential codec and the lifecycle service
//! - [`storage`] - TTL key-value storage trait and key scheme
//! - [`anomaly`] - Failed-authentication tracking and auto-revocation
//! - [`middleware`] - Request authenticator and Axum extractor
//! - [`audit`] - Write-only security audit sink

pub mod anomaly;
pub mod audit;
pub mod config;
pub mod error;
pub mod middleware;
pub mod storage;
pub mod token;
pub mod types;

pub use anomaly::FailureTracker;
pub use audit::{AuditAction, AuditRecord, AuditSink, TracingAuditSink};
pub use config::{AnomalyConfig, AuthConfig, SigningSecrets};
pub use error::{AuthError, ErrorCategory};
pub use middleware::{
    Authenticated, AuthContext, AuthState, BearerAuth, REFRESH_TOKEN_HEADER, RequestAuthenticator,
    RequestCredentials,
};
pub use storage::{OpOutcome, StorageError, StorageResult, StoreOp, TokenStorage};
pub use token::{
    Claims, IssuedToken, JwtService, RotatedPair, TokenKind, TokenPair, TokenService, Verification,
};
pub use types::{OriginMetadata, Role, SubjectId};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::anomaly::FailureTracker;
    pub use crate::audit::{AuditSink, TracingAuditSink};
    pub use crate::config::AuthConfig;
    pub use crate::error::AuthError;
    pub use crate::middleware::{AuthState, BearerAuth, RequestAuthenticator};
    pub use crate::storage::TokenStorage;
    pub use crate::token::{JwtService, TokenService};
    pub use crate::types::{Role, SubjectId};
    pub use crate::AuthResult;
}
