//! JWT claims for Parley access and refresh tokens.

use serde::{Deserialize, Serialize};

/// Discriminator carried by every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (username).
    pub sub: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
    #[serde(rename = "type")]
    pub token_type: TokenKind,
}

/// Claims of a token that passed signature, expiry and kind checks.
///
/// Only [`JwtManager`](super::jwt::JwtManager) can build one, so holding a
/// `VerifiedClaims` proves the token was validated first.
#[derive(Debug, Clone)]
pub struct VerifiedClaims(Claims);

impl VerifiedClaims {
    pub(super) const fn new(claims: Claims) -> Self {
        Self(claims)
    }

    pub const fn claims(&self) -> &Claims {
        &self.0
    }

    pub fn username(&self) -> &str {
        &self.0.sub
    }

    pub const fn expires_at(&self) -> i64 {
        self.0.exp
    }

    pub const fn kind(&self) -> TokenKind {
        self.0.token_type
    }
}
