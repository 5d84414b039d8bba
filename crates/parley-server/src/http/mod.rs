//! HTTP surface: router assembly.

pub mod auth;
pub mod routes;

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod routes_tests;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

use crate::realtime::handler::ws_upgrade;
use crate::state::AppState;

/// Build the full router. Routes that need an access token sit behind
/// [`auth::require_auth`]; `/refresh` and `/logout` read a refresh token
/// themselves and `/ws` authenticates before upgrading.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/users", get(routes::list_users))
        .route("/chats", get(routes::list_chats))
        .route("/messages", get(routes::list_messages))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/users", post(routes::create_user))
        .route("/login", post(routes::login))
        .route("/delete", post(routes::delete_account))
        .route("/refresh", post(routes::refresh))
        .route("/logout", post(routes::logout))
        .route("/encrypt", post(routes::encrypt))
        .route("/decrypt", post(routes::decrypt))
        .route("/ws", get(ws_upgrade))
        .merge(protected)
        .with_state(state)
}
