//! HTTP handlers for accounts, token refresh, history and sealed text.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use parley_crypto::{CryptoError, open_text, seal_text};
use serde::{Deserialize, Serialize};

use super::auth::bearer_token;
use crate::accounts::UserSummary;
use crate::auth::{TokenPair, VerifiedClaims};
use crate::error::{ChatError, ChatResult};
use crate::state::AppState;
use crate::storage::millis_to_rfc3339;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UsernameResponse {
    pub username: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatSummary {
    pub username: String,
    pub last_message: String,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    pub user: String,
}

#[derive(Debug, Serialize)]
pub struct ThreadEntry {
    pub id: i64,
    pub from: String,
    pub to: String,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct SealRequest {
    pub text: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SealResponse {
    pub crypt: String,
}

#[derive(Debug, Serialize)]
pub struct OpenResponse {
    pub text: String,
}

/// `POST /users`
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ChatResult<(StatusCode, Json<UsernameResponse>)> {
    let user = state
        .accounts
        .register(&req.username, &req.email, &req.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(UsernameResponse {
            username: user.username,
        }),
    ))
}

/// `GET /users`
pub async fn list_users(State(state): State<AppState>) -> ChatResult<Json<Vec<UserSummary>>> {
    Ok(Json(state.accounts.list_users().await?))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> ChatResult<Json<LoginResponse>> {
    let pair = state.accounts.login(&req.username, &req.password).await?;
    Ok(Json(LoginResponse {
        username: req.username,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// `POST /delete`
pub async fn delete_account(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> ChatResult<Json<MessageResponse>> {
    state
        .accounts
        .delete_account(&req.username, &req.password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Account deleted".into(),
    }))
}

/// `POST /refresh` with the refresh token as bearer.
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> ChatResult<Json<TokenPair>> {
    let token = bearer_token(&headers).ok_or(ChatError::InvalidCredential)?;
    Ok(Json(state.tokens.rotate(token).await?))
}

/// `POST /logout` with the refresh token as bearer.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ChatResult<StatusCode> {
    let token = bearer_token(&headers).ok_or(ChatError::InvalidCredential)?;
    state.tokens.revoke(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /chats`
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(claims): Extension<VerifiedClaims>,
) -> ChatResult<Json<Vec<ChatSummary>>> {
    let peers = state.messages.list_peers(claims.username()).await?;
    Ok(Json(
        peers
            .into_iter()
            .map(|p| ChatSummary {
                username: p.peer,
                last_message: p.last_message,
                timestamp: millis_to_rfc3339(p.created_at),
            })
            .collect(),
    ))
}

/// `GET /messages?user=<peer>`
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<VerifiedClaims>,
    Query(query): Query<ThreadQuery>,
) -> ChatResult<Json<Vec<ThreadEntry>>> {
    let thread = state
        .messages
        .list_thread(claims.username(), &query.user)
        .await?;
    Ok(Json(
        thread
            .into_iter()
            .map(|m| ThreadEntry {
                timestamp: m.created_rfc3339(),
                id: m.id,
                from: m.sender,
                to: m.recipient,
                content: m.content,
            })
            .collect(),
    ))
}

/// `POST /encrypt`
pub async fn encrypt(
    State(state): State<AppState>,
    Json(req): Json<SealRequest>,
) -> ChatResult<Json<SealResponse>> {
    if req.password.is_empty() {
        return Err(ChatError::Validation("Password is required".into()));
    }
    let hasher = state.hasher.clone();
    let crypt = tokio::task::spawn_blocking(move || seal_text(&hasher, &req.text, &req.password))
        .await
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))??;
    Ok(Json(SealResponse { crypt }))
}

/// `POST /decrypt`
pub async fn decrypt(
    State(state): State<AppState>,
    Json(req): Json<SealRequest>,
) -> ChatResult<Json<OpenResponse>> {
    let hasher = state.hasher.clone();
    let text = tokio::task::spawn_blocking(move || open_text(&hasher, &req.text, &req.password))
        .await
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))??;
    Ok(Json(OpenResponse { text }))
}
