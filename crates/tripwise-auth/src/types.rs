//! Shared types for the auth subsystem.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Subject (user) identifier as stored in the relational user table.
pub type SubjectId = i64;

/// Authorization tier embedded in every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular traveller account.
    User,
    /// Moderation/administration account.
    Admin,
}

impl Role {
    /// Returns the role name as embedded in token claims.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request origin metadata attached to audit records.
///
/// Captured from transport headers; both fields are best-effort and may be
/// absent for internal calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginMetadata {
    /// Client IP address (or forwarded-for value).
    pub ip: Option<String>,

    /// Client user agent string.
    pub user_agent: Option<String>,
}

impl OriginMetadata {
    /// Creates origin metadata from optional transport values.
    #[must_use]
    pub fn new(ip: Option<String>, user_agent: Option<String>) -> Self {
        Self { ip, user_agent }
    }
}
