//! Auth subsystem configuration.
//!
//! Token lifetimes, the refresh session cap, the grace window, anomaly
//! thresholds, and signing secrets. Durations are human-readable in config
//! files ("15m", "7d") via `humantime_serde`.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! access_token_lifetime = "15m"
//! refresh_token_lifetime = "7d"
//! grace_window = "5m"
//! max_sessions_per_user = 5
//!
//! [auth.anomaly]
//! failure_threshold = 5
//! failure_window = "5m"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the token/session subsystem.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Access token lifetime. Short-lived; the refresh protocol papers over
    /// expiry for well-behaved clients.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// How long a consumed refresh token remains acceptable to a caller
    /// that lost the rotation race (e.g. a second browser tab).
    #[serde(with = "humantime_serde")]
    pub grace_window: Duration,

    /// Maximum concurrently live refresh sessions per subject. Issuing one
    /// more evicts the oldest.
    pub max_sessions_per_user: usize,

    /// Failed-authentication anomaly detection.
    pub anomaly: AnomalyConfig,

    /// Token signing secrets.
    pub secrets: SigningSecrets,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime: Duration::from_secs(15 * 60),
            refresh_token_lifetime: Duration::from_secs(7 * 24 * 3600),
            grace_window: Duration::from_secs(300),
            max_sessions_per_user: 5,
            anomaly: AnomalyConfig::default(),
            secrets: SigningSecrets::default(),
        }
    }
}

/// Configuration for the failed-authentication tracker.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Failure count that triggers mass revocation for a subject.
    pub failure_threshold: u32,

    /// Counting window. The counter expires naturally after this duration.
    #[serde(with = "humantime_serde")]
    pub failure_window: Duration,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(300),
        }
    }
}

/// Signing secrets for the two token kinds.
///
/// Access and refresh tokens are signed with different secrets so a leaked
/// access secret cannot forge refresh tokens. Both must be set and must
/// differ; `JwtService::new` rejects anything else.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningSecrets {
    /// HMAC secret for access tokens.
    pub access_secret: String,

    /// HMAC secret for refresh tokens.
    pub refresh_secret: String,
}

impl SigningSecrets {
    /// Creates a secrets pair from explicit values.
    #[must_use]
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
        }
    }
}
