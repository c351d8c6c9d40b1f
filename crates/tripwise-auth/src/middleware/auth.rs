//! Bearer token authentication extractor.
//!
//! Axum extractor that pulls credentials out of the request, runs the
//! authentication state machine, and injects an [`AuthContext`].
//!
//! The access token travels as `Authorization: Bearer <token>`. The refresh
//! token, when a client wants silent rotation, travels in the dedicated
//! `x-refresh-token` header; the two never share a field, so access and
//! refresh secrets cannot be confused.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use tripwise_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn protected_handler(BearerAuth(auth): BearerAuth) -> String {
//!     format!("Hello, subject {}!", auth.subject())
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, header::USER_AGENT, request::Parts},
};

use crate::error::AuthError;
use crate::types::OriginMetadata;

use super::authenticator::{RequestAuthenticator, RequestCredentials};
use super::types::AuthContext;

/// Header carrying the refresh token for silent rotation.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Header carrying the original client IP behind a proxy.
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

// =============================================================================
// Auth State
// =============================================================================

/// State required for bearer token authentication.
///
/// Include this in your application state and make it available to the
/// `BearerAuth` extractor via `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    /// The request authenticator.
    pub authenticator: Arc<RequestAuthenticator>,
}

impl AuthState {
    /// Creates a new auth state.
    pub fn new(authenticator: Arc<RequestAuthenticator>) -> Self {
        Self { authenticator }
    }
}

// =============================================================================
// Bearer Auth Extractor
// =============================================================================

/// Axum extractor that authenticates the request and yields its context.
///
/// This extractor:
/// 1. Extracts the `Authorization: Bearer <token>` header
/// 2. Extracts the optional `x-refresh-token` header
/// 3. Captures origin metadata (forwarded-for, user agent)
/// 4. Runs the three-tier authentication state machine
///
/// When the state machine silently rotated, the new credentials sit on
/// [`AuthContext::rotated`]; the response layer is responsible for handing
/// them back to the client.
///
/// # Errors
///
/// Returns `AuthError` (which implements `IntoResponse`) for every
/// rejection; see [`RequestAuthenticator::authenticate`].
pub struct BearerAuth(pub AuthContext);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let access_token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
            .map(ToString::to_string)
            .ok_or(AuthError::AuthenticationRequired)?;

        let refresh_token = parts
            .headers
            .get(REFRESH_TOKEN_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|t| !t.is_empty())
            .map(ToString::to_string);

        let credentials = RequestCredentials {
            access_token,
            refresh_token,
            origin: origin_from_parts(parts),
        };

        let accepted = auth_state.authenticator.authenticate(&credentials).await?;

        Ok(BearerAuth(AuthContext {
            claims: Arc::new(accepted.claims),
            via_grace: accepted.via_grace,
            rotated: accepted.rotated,
        }))
    }
}

/// Captures best-effort origin metadata from transport headers.
fn origin_from_parts(parts: &Parts) -> OriginMetadata {
    let ip = parts
        .headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|h| h.to_str().ok())
        // The first entry in a forwarded chain is the originating client.
        .and_then(|h| h.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let user_agent = parts
        .headers
        .get(USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(ToString::to_string);

    OriginMetadata::new(ip, user_agent)
}

// =============================================================================
// Tests
// =============================================================================
