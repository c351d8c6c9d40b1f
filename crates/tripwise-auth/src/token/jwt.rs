//! JWT issuance and verification.
//!
//! Tokens are compact HS256 JWTs. Access and refresh tokens are signed with
//! *different* secrets, so a leaked access secret cannot forge refresh
//! tokens. Verification is expressed as a tagged result
//! ([`Verification`]) rather than an error: "expired but structurally
//! valid" carries its claims, because the rotation and grace paths need
//! them.
//!
//! # Example
//!
//! ```ignore
//! use tripwise_auth::token::jwt::{JwtService, TokenKind, Verification};
//!
//! let jwt = JwtService::new(&secrets)?;
//! let issued = jwt.issue(42, Role::User, TokenKind::Access, Duration::minutes(15))?;
//!
//! match jwt.verify(&issued.token, TokenKind::Access) {
//!     Verification::Valid(claims) => { /* ... */ }
//!     Verification::Expired(claims) => { /* grace / rotation */ }
//!     Verification::Malformed { .. } => { /* reject */ }
//! }
//! ```

use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::config::SigningSecrets;
use crate::error::AuthError;
use crate::types::{Role, SubjectId};

// ============================================================================
// Token Kind
// ============================================================================

/// The two token kinds issued by the subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived bearer token presented on every request.
    Access,
    /// Long-lived token exchanged exactly once for a new pair.
    Refresh,
}

impl TokenKind {
    /// Returns the kind name as embedded in claims and storage keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Token claims.
///
/// A fixed struct with exactly these fields; unknown claims in a presented
/// token are ignored, never trusted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user id).
    pub sub: SubjectId,

    /// Authorization tier.
    pub role: Role,

    /// Unique token id ("jti"), minted per issuance and never reused.
    pub jti: String,

    /// Token kind.
    pub kind: TokenKind,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,
}

impl Claims {
    /// Returns the expiry as an `OffsetDateTime`.
    ///
    /// Falls back to the Unix epoch for out-of-range values, which then
    /// read as long expired.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.exp).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Returns the remaining lifetime relative to `now`. Negative when
    /// expired.
    #[must_use]
    pub fn remaining_lifetime(&self, now: OffsetDateTime) -> Duration {
        self.expires_at() - now
    }
}

/// A freshly issued token together with its claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The encoded token.
    pub token: String,

    /// The claims embedded in it.
    pub claims: Claims,
}

// ============================================================================
// Verification Result
// ============================================================================

/// The outcome of verifying a presented token.
///
/// Callers are forced to handle every case explicitly; there is no way to
/// read claims without deciding what an expired token means on their path.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    /// Signature and expiry check out.
    Valid(Claims),

    /// Signature checks out but the token is past its expiry.
    Expired(Claims),

    /// Bad structure, bad signature, or wrong kind. Always fatal.
    Malformed {
        /// Description of what failed.
        message: String,
    },
}

impl Verification {
    /// Returns the claims for structurally valid tokens, expired or not.
    #[must_use]
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Self::Valid(claims) | Self::Expired(claims) => Some(claims),
            Self::Malformed { .. } => None,
        }
    }
}

// ============================================================================
// JWT Service
// ============================================================================

/// Service for issuing and verifying tokens.
///
/// Stateless and thread-safe; shared across tasks behind an `Arc`.
pub struct JwtService {
    access: KindKeys,
    refresh: KindKeys,
}

struct KindKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KindKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl JwtService {
    /// Creates a JWT service from configured secrets.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either secret is empty or the two
    /// are identical.
    pub fn new(secrets: &SigningSecrets) -> Result<Self, AuthError> {
        if secrets.access_secret.is_empty() || secrets.refresh_secret.is_empty() {
            return Err(AuthError::configuration("Signing secrets must be set"));
        }
        if secrets.access_secret == secrets.refresh_secret {
            return Err(AuthError::configuration(
                "Access and refresh secrets must differ",
            ));
        }

        Ok(Self {
            access: KindKeys::from_secret(&secrets.access_secret),
            refresh: KindKeys::from_secret(&secrets.refresh_secret),
        })
    }

    fn keys(&self, kind: TokenKind) -> &KindKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Issues a token of the given kind.
    ///
    /// Mints a fresh token id; two issuances never share one.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn issue(
        &self,
        sub: SubjectId,
        role: Role,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<IssuedToken, AuthError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub,
            role,
            jti: Uuid::new_v4().to_string(),
            kind,
            exp: (now + ttl).unix_timestamp(),
            iat: now.unix_timestamp(),
        };

        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &self.keys(kind).encoding)
            .map_err(|e| AuthError::invalid_token(format!("Failed to encode token: {e}")))?;

        Ok(IssuedToken { token, claims })
    }

    /// Verifies a presented token against the given kind's secret.
    ///
    /// Expiry is evaluated here rather than delegated to the JWT library so
    /// an expired-but-authentic token still yields its claims.
    #[must_use]
    pub fn verify(&self, token: &str, kind: TokenKind) -> Verification {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;

        let claims = match decode::<Claims>(token, &self.keys(kind).decoding, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                return Verification::Malformed {
                    message: e.to_string(),
                };
            }
        };

        if claims.kind != kind {
            return Verification::Malformed {
                message: format!("Expected {kind} token, got {}", claims.kind),
            };
        }

        if claims.exp < OffsetDateTime::now_utc().unix_timestamp() {
            Verification::Expired(claims)
        } else {
            Verification::Valid(claims)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> JwtService {
        JwtService::new(&SigningSecrets::new(
            "access-secret-for-tests",
            "refresh-secret-for-tests",
        ))
        .unwrap()
    }

    #[test]
    fn test_rejects_empty_secrets() {
        let result = JwtService::new(&SigningSecrets::default());
        assert!(matches!(result, Err(AuthError::Configuration { .. })));

        let result = JwtService::new(&SigningSecrets::new("only-access", ""));
        assert!(matches!(result, Err(AuthError::Configuration { .. })));
    }

    #[test]
    fn test_rejects_identical_secrets() {
        let result = JwtService::new(&SigningSecrets::new("same", "same"));
        assert!(matches!(result, Err(AuthError::Configuration { .. })));
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let jwt = test_service();
        let issued = jwt
            .issue(42, Role::User, TokenKind::Access, Duration::minutes(15))
            .unwrap();

        match jwt.verify(&issued.token, TokenKind::Access) {
            Verification::Valid(claims) => {
                assert_eq!(claims, issued.claims);
                assert_eq!(claims.sub, 42);
                assert_eq!(claims.role, Role::User);
                assert_eq!(claims.kind, TokenKind::Access);
                assert!(claims.exp > claims.iat);
            }
            other => panic!("expected Valid, got {other:?}"),
        }
    }

    #[test]
    fn test_expired_token_yields_claims() {
        let jwt = test_service();
        let issued = jwt
            .issue(42, Role::User, TokenKind::Refresh, Duration::seconds(-60))
            .unwrap();

        match jwt.verify(&issued.token, TokenKind::Refresh) {
            Verification::Expired(claims) => {
                assert_eq!(claims.sub, 42);
                assert_eq!(claims.jti, issued.claims.jti);
            }
            other => panic!("expected Expired, got {other:?}"),
        }
    }

    #[test]
    fn test_kind_mismatch_is_malformed() {
        let jwt = test_service();
        let issued = jwt
            .issue(42, Role::User, TokenKind::Access, Duration::minutes(15))
            .unwrap();

        // Right secret for refresh, but the token is an access token; either
        // way it must not pass as a refresh token.
        assert!(matches!(
            jwt.verify(&issued.token, TokenKind::Refresh),
            Verification::Malformed { .. }
        ));
    }

    #[test]
    fn test_cross_secret_rejected() {
        let jwt1 = test_service();
        let jwt2 = JwtService::new(&SigningSecrets::new("other-access", "other-refresh")).unwrap();

        let issued = jwt1
            .issue(42, Role::Admin, TokenKind::Access, Duration::minutes(15))
            .unwrap();

        assert!(matches!(
            jwt2.verify(&issued.token, TokenKind::Access),
            Verification::Malformed { .. }
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let jwt = test_service();
        assert!(matches!(
            jwt.verify("not-a-jwt", TokenKind::Access),
            Verification::Malformed { .. }
        ));
    }

    #[test]
    fn test_each_issuance_mints_unique_jti() {
        let jwt = test_service();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            let issued = jwt
                .issue(42, Role::User, TokenKind::Access, Duration::minutes(1))
                .unwrap();
            assert!(seen.insert(issued.claims.jti));
        }
    }

    #[test]
    fn test_verification_claims_accessor() {
        let jwt = test_service();
        let issued = jwt
            .issue(7, Role::User, TokenKind::Access, Duration::minutes(1))
            .unwrap();

        let verification = jwt.verify(&issued.token, TokenKind::Access);
        assert_eq!(verification.claims().map(|c| c.sub), Some(7));

        let malformed = Verification::Malformed {
            message: "x".to_string(),
        };
        assert!(malformed.claims().is_none());
    }

    #[test]
    fn test_remaining_lifetime() {
        let jwt = test_service();
        let issued = jwt
            .issue(7, Role::User, TokenKind::Refresh, Duration::minutes(10))
            .unwrap();

        let remaining = issued.claims.remaining_lifetime(OffsetDateTime::now_utc());
        assert!(remaining > Duration::minutes(9));
        assert!(remaining <= Duration::minutes(10));
    }
}
