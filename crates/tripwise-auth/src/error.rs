//! Authentication error types.
//!
//! Every rejection the subsystem can produce is a variant here, with a
//! stable machine-readable reason code that clients can branch on. Variants
//! never carry store keys or secret material.

use std::fmt;

/// Errors that can occur during token issuance, rotation, and verification.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token is malformed: bad structure, bad signature, or wrong kind.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The token has a valid signature but is past its expiry.
    #[error("Token expired")]
    TokenExpired,

    /// The token id is on the blacklist.
    #[error("Token revoked")]
    TokenRevoked,

    /// The token verified but no live session record exists for it.
    #[error("No active session for token")]
    NoActiveSession,

    /// A refresh token was presented for rotation after it was already
    /// consumed (or was never issued).
    #[error("Invalid or already used refresh token")]
    TokenReused,

    /// The rotation sequence failed partway; no new credentials were issued.
    #[error("Token rotation failed: {message}")]
    RotationFailed {
        /// Description of the rotation failure.
        message: String,
    },

    /// Every fallback was exhausted; the caller must authenticate again.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// The session store or codec could not be reached.
    #[error("Service unavailable: {message}")]
    ServiceUnavailable {
        /// Description of the infrastructure failure.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `RotationFailed` error.
    #[must_use]
    pub fn rotation_failed(message: impl Into<String>) -> Self {
        Self::RotationFailed {
            message: message.into(),
        }
    }

    /// Creates a new `ServiceUnavailable` error.
    #[must_use]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns the stable machine-readable reason code for this error.
    ///
    /// These strings are part of the public contract; clients branch on them.
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidToken { .. } => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::TokenRevoked => "token_revoked",
            Self::NoActiveSession => "no_active_session",
            Self::TokenReused => "token_reused",
            Self::RotationFailed { .. } => "rotation_failed",
            Self::AuthenticationRequired => "authentication_required",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::Configuration { .. } => "configuration_error",
        }
    }

    /// Returns `true` if this rejection maps to an HTTP 401.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken { .. }
                | Self::TokenExpired
                | Self::TokenRevoked
                | Self::NoActiveSession
                | Self::TokenReused
                | Self::RotationFailed { .. }
                | Self::AuthenticationRequired
        )
    }

    /// Returns `true` if this maps to an HTTP 5xx.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable { .. } | Self::Configuration { .. }
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidToken { .. } | Self::TokenExpired => ErrorCategory::Token,
            Self::TokenRevoked | Self::NoActiveSession | Self::TokenReused => {
                ErrorCategory::Session
            }
            Self::RotationFailed { .. } | Self::AuthenticationRequired => ErrorCategory::Rotation,
            Self::ServiceUnavailable { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Token validation errors (structure, signature, expiry).
    Token,
    /// Session state errors (blacklist, membership, replay).
    Session,
    /// Rotation protocol errors.
    Rotation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => write!(f, "token"),
            Self::Session => write!(f, "session"),
            Self::Rotation => write!(f, "rotation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
