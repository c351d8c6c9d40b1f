//! Authentication context attached to accepted requests.

use std::sync::Arc;

use crate::token::jwt::Claims;
use crate::token::service::RotatedPair;
use crate::types::{Role, SubjectId};

/// Context available to handlers after a request passed authentication.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Verified claims. For grace acceptances these are the expired access
    /// claims; for silent rotations, the claims of the new access token.
    pub claims: Arc<Claims>,

    /// `true` when the request was accepted through the grace window.
    pub via_grace: bool,

    /// Set when the authenticator silently rotated; the response layer must
    /// hand these credentials back to the client.
    pub rotated: Option<RotatedPair>,
}

impl AuthContext {
    /// Returns the authenticated subject id.
    #[must_use]
    pub fn subject(&self) -> SubjectId {
        self.claims.sub
    }

    /// Returns the authenticated role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.claims.role
    }

    /// Returns `true` for admin subjects.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.claims.role == Role::Admin
    }
}
