//! Per-request authentication state machine.
//!
//! Every protected route funnels through [`RequestAuthenticator::authenticate`],
//! which decides in three tiers:
//!
//! 1. A valid access token passes the blacklist and session-membership gates.
//! 2. An expired access token is tolerated if its refresh companion was
//!    consumed within the grace window (a second tab losing the rotation
//!    race).
//! 3. Otherwise, a supplied refresh token is silently rotated and the new
//!    credentials are surfaced for the client to adopt.
//!
//! Every rejection is terminal here; nothing is retried. Store failures
//! surface as `ServiceUnavailable` and are never read as "not found".

use std::sync::Arc;

use crate::error::AuthError;
use crate::token::jwt::{Claims, TokenKind, Verification};
use crate::token::service::{RotatedPair, TokenService};
use crate::types::OriginMetadata;

/// Credentials extracted from one inbound request.
#[derive(Debug, Clone)]
pub struct RequestCredentials {
    /// Bearer access token from the `Authorization` header.
    pub access_token: String,

    /// Optional refresh token from its dedicated transport channel.
    pub refresh_token: Option<String>,

    /// Request origin, threaded into audit records on rotation.
    pub origin: OriginMetadata,
}

/// A successful authentication decision.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// Verified claims the request acts under.
    pub claims: Claims,

    /// `true` when accepted through the grace window with expired claims.
    pub via_grace: bool,

    /// New credentials from a silent rotation, if one happened.
    pub rotated: Option<RotatedPair>,
}

/// Authenticates inbound requests against the token lifecycle state.
pub struct RequestAuthenticator {
    tokens: Arc<TokenService>,
}

impl RequestAuthenticator {
    /// Creates an authenticator over a lifecycle service.
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    /// Returns the underlying lifecycle service.
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Runs the authentication state machine for one request.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` for a malformed access token.
    /// - `TokenRevoked` when the access token id is blacklisted.
    /// - `NoActiveSession` when no live session record backs a valid token.
    /// - `TokenExpired` when the access token expired and no refresh token
    ///   was supplied.
    /// - `AuthenticationRequired` when every fallback failed.
    /// - `ServiceUnavailable` for store failures on any tier.
    pub async fn authenticate(
        &self,
        credentials: &RequestCredentials,
    ) -> Result<Authenticated, AuthError> {
        let jwt = self.tokens.jwt();
        match jwt.verify(&credentials.access_token, TokenKind::Access) {
            Verification::Malformed { message } => {
                tracing::debug!("rejected malformed access token");
                Err(AuthError::invalid_token(message))
            }
            Verification::Valid(claims) => self.accept_valid(claims).await,
            Verification::Expired(claims) => self.accept_expired(claims, credentials).await,
        }
    }

    /// Tier one: blacklist and session-membership gates.
    async fn accept_valid(&self, claims: Claims) -> Result<Authenticated, AuthError> {
        if self.tokens.is_blacklisted(&claims.jti).await? {
            tracing::debug!(subject_id = claims.sub, "rejected blacklisted access token");
            return Err(AuthError::TokenRevoked);
        }
        if !self.tokens.has_active_session(&claims).await? {
            tracing::debug!(subject_id = claims.sub, "rejected token without session");
            return Err(AuthError::NoActiveSession);
        }
        Ok(Authenticated {
            claims,
            via_grace: false,
            rotated: None,
        })
    }

    /// Tiers two and three: grace window, then silent rotation.
    async fn accept_expired(
        &self,
        claims: Claims,
        credentials: &RequestCredentials,
    ) -> Result<Authenticated, AuthError> {
        // A logged-out token stays rejected even while expired.
        if self.tokens.is_blacklisted(&claims.jti).await? {
            tracing::debug!(subject_id = claims.sub, "rejected blacklisted expired token");
            return Err(AuthError::TokenRevoked);
        }

        let Some(refresh_token) = credentials.refresh_token.as_deref() else {
            return Err(AuthError::TokenExpired);
        };

        // The grace lookup is keyed on the consumed refresh token's id; a
        // structurally bad refresh token has nothing to look up.
        let refresh_claims = match self.tokens.jwt().verify(refresh_token, TokenKind::Refresh) {
            Verification::Valid(rc) | Verification::Expired(rc) => rc,
            Verification::Malformed { .. } => {
                tracing::debug!(
                    subject_id = claims.sub,
                    "rejected malformed refresh token on expired path"
                );
                return Err(AuthError::AuthenticationRequired);
            }
        };

        if refresh_claims.sub == claims.sub
            && self
                .tokens
                .in_grace_window(refresh_claims.sub, &refresh_claims.jti)
                .await?
        {
            tracing::debug!(subject_id = claims.sub, "accepted under grace window");
            return Ok(Authenticated {
                claims,
                via_grace: true,
                rotated: None,
            });
        }

        match self.tokens.rotate(refresh_token, credentials.origin.clone()).await {
            Ok(rotated) => {
                let new_claims = match self
                    .tokens
                    .jwt()
                    .verify(&rotated.pair.access_token, TokenKind::Access)
                {
                    Verification::Valid(nc) => nc,
                    // A token we just issued failing to verify means the
                    // codec itself is broken.
                    _ => {
                        return Err(AuthError::service_unavailable(
                            "Freshly issued access token failed verification",
                        ));
                    }
                };
                tracing::debug!(subject_id = new_claims.sub, "silently rotated credentials");
                Ok(Authenticated {
                    claims: new_claims,
                    via_grace: false,
                    rotated: Some(rotated),
                })
            }
            Err(e @ AuthError::ServiceUnavailable { .. }) => Err(e),
            Err(e) => {
                tracing::debug!(subject_id = claims.sub, error = %e, "silent rotation rejected");
                Err(AuthError::AuthenticationRequired)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditRecord, AuditSink};
    use crate::config::{AuthConfig, SigningSecrets};
    use crate::storage::mock::MockStorage;
    use crate::token::jwt::JwtService;
    use crate::types::Role;
    use std::time::Duration;

    struct NullSink;

    #[async_trait::async_trait]
    impl AuditSink for NullSink {
        async fn record(&self, _record: AuditRecord) {}
    }

    fn setup_with(config: AuthConfig) -> (RequestAuthenticator, Arc<TokenService>) {
        let storage = Arc::new(MockStorage::new());
        let jwt = Arc::new(JwtService::new(&config.secrets).unwrap());
        let tokens = Arc::new(TokenService::new(jwt, storage, Arc::new(NullSink), config));
        (RequestAuthenticator::new(tokens.clone()), tokens)
    }

    fn setup() -> (RequestAuthenticator, Arc<TokenService>) {
        setup_with(AuthConfig {
            secrets: SigningSecrets::new("access-secret", "refresh-secret"),
            ..AuthConfig::default()
        })
    }

    fn creds(access: &str, refresh: Option<&str>) -> RequestCredentials {
        RequestCredentials {
            access_token: access.to_string(),
            refresh_token: refresh.map(ToString::to_string),
            origin: OriginMetadata::default(),
        }
    }

    #[tokio::test]
    async fn test_valid_token_accepted() {
        let (authenticator, tokens) = setup();
        let pair = tokens.issue(42, Role::User).await.unwrap();

        let accepted = authenticator
            .authenticate(&creds(&pair.access_token, None))
            .await
            .unwrap();
        assert_eq!(accepted.claims.sub, 42);
        assert!(!accepted.via_grace);
        assert!(accepted.rotated.is_none());
    }

    #[tokio::test]
    async fn test_malformed_token_rejected() {
        let (authenticator, _tokens) = setup();
        let result = authenticator.authenticate(&creds("garbage", None)).await;
        assert!(matches!(result, Err(AuthError::InvalidToken { .. })));
    }

    #[tokio::test]
    async fn test_valid_token_without_session_rejected() {
        let (authenticator, tokens) = setup();
        let pair = tokens.issue(42, Role::User).await.unwrap();
        tokens.revoke_all(42).await.unwrap();

        let result = authenticator
            .authenticate(&creds(&pair.access_token, None))
            .await;
        assert!(matches!(result, Err(AuthError::NoActiveSession)));
    }

    #[tokio::test]
    async fn test_logged_out_token_rejected() {
        let (authenticator, tokens) = setup();
        let pair = tokens.issue(42, Role::User).await.unwrap();

        let claims = match tokens.jwt().verify(&pair.access_token, TokenKind::Access) {
            Verification::Valid(claims) => claims,
            other => panic!("expected valid access token, got {other:?}"),
        };
        tokens.logout(&claims, OriginMetadata::default()).await.unwrap();

        let result = authenticator
            .authenticate(&creds(&pair.access_token, None))
            .await;
        assert!(matches!(result, Err(AuthError::TokenRevoked)));
    }

    #[tokio::test]
    async fn test_expired_without_refresh_rejected() {
        let (authenticator, tokens) = setup_with(AuthConfig {
            access_token_lifetime: Duration::from_secs(0),
            secrets: SigningSecrets::new("access-secret", "refresh-secret"),
            ..AuthConfig::default()
        });
        let pair = tokens.issue(42, Role::User).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let result = authenticator
            .authenticate(&creds(&pair.access_token, None))
            .await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_expired_with_refresh_rotates_silently() {
        let (authenticator, tokens) = setup_with(AuthConfig {
            access_token_lifetime: Duration::from_secs(0),
            secrets: SigningSecrets::new("access-secret", "refresh-secret"),
            ..AuthConfig::default()
        });
        let pair = tokens.issue(42, Role::User).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let accepted = authenticator
            .authenticate(&creds(&pair.access_token, Some(&pair.refresh_token)))
            .await
            .unwrap();
        assert_eq!(accepted.claims.sub, 42);
        assert!(!accepted.via_grace);
        let rotated = accepted.rotated.expect("rotation expected");
        assert_ne!(rotated.pair.refresh_token, pair.refresh_token);
    }

    #[tokio::test]
    async fn test_grace_window_accepts_racing_client() {
        let (authenticator, tokens) = setup_with(AuthConfig {
            access_token_lifetime: Duration::from_secs(0),
            secrets: SigningSecrets::new("access-secret", "refresh-secret"),
            ..AuthConfig::default()
        });
        let pair = tokens.issue(42, Role::User).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        // Another tab rotates first.
        tokens
            .rotate(&pair.refresh_token, OriginMetadata::default())
            .await
            .unwrap();

        // The losing tab retries with its stale credentials.
        let accepted = authenticator
            .authenticate(&creds(&pair.access_token, Some(&pair.refresh_token)))
            .await
            .unwrap();
        assert!(accepted.via_grace);
        assert!(accepted.rotated.is_none());
        assert_eq!(accepted.claims.sub, 42);
    }

    #[tokio::test]
    async fn test_consumed_refresh_after_grace_rejected() {
        let (authenticator, tokens) = setup_with(AuthConfig {
            access_token_lifetime: Duration::from_secs(0),
            grace_window: Duration::from_secs(1),
            secrets: SigningSecrets::new("access-secret", "refresh-secret"),
            ..AuthConfig::default()
        });
        let pair = tokens.issue(42, Role::User).await.unwrap();
        tokens
            .rotate(&pair.refresh_token, OriginMetadata::default())
            .await
            .unwrap();

        // Wait out both the access lifetime and the grace window.
        tokio::time::sleep(Duration::from_millis(2100)).await;

        let result = authenticator
            .authenticate(&creds(&pair.access_token, Some(&pair.refresh_token)))
            .await;
        assert!(matches!(result, Err(AuthError::AuthenticationRequired)));
    }

    #[tokio::test]
    async fn test_expired_with_malformed_refresh_rejected() {
        let (authenticator, tokens) = setup_with(AuthConfig {
            access_token_lifetime: Duration::from_secs(0),
            secrets: SigningSecrets::new("access-secret", "refresh-secret"),
            ..AuthConfig::default()
        });
        let pair = tokens.issue(42, Role::User).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let result = authenticator
            .authenticate(&creds(&pair.access_token, Some("garbage")))
            .await;
        assert!(matches!(result, Err(AuthError::AuthenticationRequired)));
    }

    #[tokio::test]
    async fn test_store_failure_is_service_unavailable() {
        let config = AuthConfig {
            secrets: SigningSecrets::new("access-secret", "refresh-secret"),
            ..AuthConfig::default()
        };
        let jwt = Arc::new(JwtService::new(&config.secrets).unwrap());
        let pair_source = TokenService::new(
            jwt.clone(),
            Arc::new(MockStorage::new()),
            Arc::new(NullSink),
            config.clone(),
        );
        let pair = pair_source.issue(42, Role::User).await.unwrap();

        let failing = Arc::new(TokenService::new(
            jwt,
            Arc::new(MockStorage::failing()),
            Arc::new(NullSink),
            config,
        ));
        let authenticator = RequestAuthenticator::new(failing);

        let result = authenticator
            .authenticate(&creds(&pair.access_token, None))
            .await;
        assert!(matches!(result, Err(AuthError::ServiceUnavailable { .. })));
    }
}
