//! Key scheme for token/session state.
//!
//! All keys are namespaced strings:
//!
//! - `session:{kind}:{subject}:{jti}`: live session marker
//! - `blacklist:{jti}`: revoked token id
//! - `grace:{subject}:{jti}`: consumed-refresh grace window
//! - `failures:{subject}`: failed-authentication counter

use crate::token::jwt::TokenKind;
use crate::types::SubjectId;

/// Builds the session key for a token.
#[must_use]
pub fn session_key(kind: TokenKind, subject: SubjectId, jti: &str) -> String {
    format!("session:{kind}:{subject}:{jti}")
}

/// Builds the prefix pattern matching all live sessions of one kind for a
/// subject.
#[must_use]
pub fn session_pattern(kind: TokenKind, subject: SubjectId) -> String {
    format!("session:{kind}:{subject}:*")
}

/// Builds the blacklist key for a token id.
#[must_use]
pub fn blacklist_key(jti: &str) -> String {
    format!("blacklist:{jti}")
}

/// Builds the grace-window key for a consumed refresh token.
#[must_use]
pub fn grace_key(subject: SubjectId, jti: &str) -> String {
    format!("grace:{subject}:{jti}")
}

/// Builds the prefix pattern matching all grace windows for a subject.
#[must_use]
pub fn grace_pattern(subject: SubjectId) -> String {
    format!("grace:{subject}:*")
}

/// Builds the failed-authentication counter key for a subject.
#[must_use]
pub fn failure_key(subject: SubjectId) -> String {
    format!("failures:{subject}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(
            session_key(TokenKind::Access, 42, "abc"),
            "session:access:42:abc"
        );
        assert_eq!(
            session_key(TokenKind::Refresh, 42, "abc"),
            "session:refresh:42:abc"
        );
        assert_eq!(
            session_pattern(TokenKind::Refresh, 42),
            "session:refresh:42:*"
        );
        assert_eq!(blacklist_key("abc"), "blacklist:abc");
        assert_eq!(grace_key(42, "abc"), "grace:42:abc");
        assert_eq!(grace_pattern(42), "grace:42:*");
        assert_eq!(failure_key(42), "failures:42");
    }

    #[test]
    fn test_session_key_matches_own_pattern() {
        let key = session_key(TokenKind::Refresh, 7, "xyz");
        let pattern = session_pattern(TokenKind::Refresh, 7);
        let prefix = pattern.trim_end_matches('*');
        assert!(key.starts_with(prefix));
    }
}
