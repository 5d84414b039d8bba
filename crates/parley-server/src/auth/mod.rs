//! Authentication module for the Parley server.
//!
//! JWT signing/verification and the refresh-token lifecycle built on it.

pub mod authority;
pub mod claims;
pub mod jwt;

pub use authority::{TokenAuthority, TokenPair};
pub use claims::{Claims, TokenKind, VerifiedClaims};
pub use jwt::{IssuedToken, JwtManager};
