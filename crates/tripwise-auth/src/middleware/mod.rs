//! HTTP middleware for request authentication.
//!
//! This module provides:
//!
//! - The per-request authentication state machine
//!   ([`RequestAuthenticator`])
//! - An Axum bearer-token extractor ([`BearerAuth`]) over it
//! - JSON error responses with stable reason codes
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
//! let auth_state = AuthState::new(authenticator);
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .with_state(auth_state);
//! ```

pub mod auth;
pub mod authenticator;
pub mod error;
pub mod types;

pub use auth::{AuthState, BearerAuth, REFRESH_TOKEN_HEADER};
pub use authenticator::{Authenticated, RequestAuthenticator, RequestCredentials};
pub use types::AuthContext;
