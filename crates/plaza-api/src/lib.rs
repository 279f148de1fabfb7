//! HTTP surface for Plaza. Every route except registration, login and the
//! health check requires a bearer JWT; the caller's id comes from its `sub`.

pub mod accounts;
pub mod auth;
pub mod chats;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod relationships;
pub mod stories;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::auth::AppState;
use crate::middleware::require_auth;

/// GET /health, liveness check (no auth).
pub async fn health() -> &'static str {
    "ok"
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health));

    // Routes sharing a prefix share one parameter name; each handler
    // documents what the segment holds.
    let protected_routes = Router::new()
        .route("/users", get(accounts::list_users))
        .route("/users/{user}", get(accounts::get_profile).delete(accounts::delete_user))
        .route("/users/{user}/follow", post(relationships::follow))
        .route("/users/{user}/unfollow", post(relationships::unfollow))
        .route("/users/{user}/followers", get(relationships::followers))
        .route("/users/{user}/following", get(relationships::following))
        .route("/users/{user}/posts", get(posts::user_posts))
        .route("/me", patch(accounts::update_me))
        .route("/friend-requests", get(relationships::list_requests))
        .route("/friend-requests/{id}", post(relationships::send_request))
        .route("/friend-requests/{id}/accept", post(relationships::accept_request))
        .route("/friend-requests/{id}/reject", post(relationships::reject_request))
        .route("/chats", get(chats::list_chats))
        .route("/chats/{id}", get(chats::get_chat).post(chats::open_chat))
        .route("/chats/{id}/messages", get(chats::get_messages).post(chats::send_message))
        .route("/chats/{id}/read", post(chats::mark_read))
        .route("/posts", post(posts::create_post))
        .route("/posts/{id}", delete(posts::delete_post))
        .route("/posts/{id}/like", post(posts::toggle_like))
        .route("/posts/{id}/repost", post(posts::toggle_repost))
        .route("/feed", get(posts::home_feed))
        .route("/stories", get(stories::list_authors).post(stories::create_story))
        .route("/stories/{key}", get(stories::by_username).delete(stories::delete_story))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
