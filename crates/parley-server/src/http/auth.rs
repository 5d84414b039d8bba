//! Bearer token extraction for HTTP routes.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::{ChatError, ChatResult};
use crate::state::AppState;

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validates the bearer value as an access token and stores the
/// resulting `VerifiedClaims` in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ChatResult<Response> {
    let token = bearer_token(request.headers()).ok_or(ChatError::InvalidCredential)?;
    let claims = state.tokens.validate_access(token)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
