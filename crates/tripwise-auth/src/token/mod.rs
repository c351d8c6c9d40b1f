//! Token lifecycle: issuance, verification, rotation, revocation.

pub mod jwt;
pub mod service;

pub use jwt::{Claims, IssuedToken, JwtService, TokenKind, Verification};
pub use service::{RotatedPair, TokenPair, TokenService};
