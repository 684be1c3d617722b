//! HTTP API module: state, extractors, handlers, routing.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;

pub use auth::{MaybeSession, Session, SessionStore};
pub use error::ApiError;
pub use router::api_router;

use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::AppConfig;
use crate::db::{
    CommentRepository, DbPool, MixRepository, PlayRepository, ProfileRepository,
    SessionRepository, StreamRepository, UserRepository,
};
use crate::live::LiveClient;
use crate::social::SocialClient;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: UserRepository,
    pub profiles: ProfileRepository,
    pub sessions: SessionRepository,
    pub mixes: MixRepository,
    pub comments: CommentRepository,
    pub plays: PlayRepository,
    pub streams: StreamRepository,
    pub live: LiveClient,
    pub social: SocialClient,
    pub config: Arc<AppConfig>,
    session_store: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(pool: DbPool, config: AppConfig) -> Self {
        let sessions = SessionRepository::new(pool.clone());
        Self {
            users: UserRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool.clone()),
            sessions: sessions.clone(),
            mixes: MixRepository::new(pool.clone()),
            comments: CommentRepository::new(pool.clone()),
            plays: PlayRepository::new(pool.clone()),
            streams: StreamRepository::new(pool),
            live: LiveClient::new(config.live.clone()),
            social: SocialClient::new(config.social_providers.clone()),
            config: Arc::new(config),
            session_store: Arc::new(sessions),
        }
    }
}

// Allow extracting Arc<dyn SessionStore> from AppState for the session
// extractors.
impl FromRef<AppState> for Arc<dyn SessionStore> {
    fn from_ref(state: &AppState) -> Self {
        state.session_store.clone()
    }
}
