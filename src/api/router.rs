//! API route table.

use axum::Router;
use axum::routing::{delete, get, patch, post};
use axum::Json;
use serde_json::{Value, json};

use super::AppState;
use super::handlers::{auth, engagement, mixes, plays, social, streams, uploads};

/// Liveness probe.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the `/api` router. State and middleware layers are applied by the
/// caller.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // Accounts and sessions
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/social", post(auth::social_login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        // Mixes
        .route("/mixes", post(mixes::create_mix).get(mixes::feed))
        .route(
            "/mixes/{id}",
            get(mixes::get_mix)
                .patch(mixes::update_mix)
                .delete(mixes::delete_mix),
        )
        .route("/mixes/{id}/like", post(engagement::like_mix))
        .route("/mixes/{id}/play", post(plays::play_mix))
        .route(
            "/mixes/{id}/comments",
            get(engagement::list_comments).post(engagement::create_comment),
        )
        .route("/comments/{id}/like", post(engagement::like_comment))
        // Social graph
        .route("/users/{id}/follow", post(social::follow))
        .route("/profiles/{username}", get(social::get_profile))
        .route("/profile", patch(social::update_profile))
        // Uploads
        .route("/uploads", post(uploads::upload))
        // Livestreams
        .route(
            "/live",
            post(streams::create_stream).get(streams::list_streams),
        )
        .route("/live/{id}", delete(streams::delete_stream))
}
