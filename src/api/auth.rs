//! Session extractors.
//!
//! Every mutating handler takes a [`Session`], which resolves the
//! `Authorization: Bearer <token>` header against the session store and
//! fails the whole request with 401 when absent or stale. Read endpoints
//! that personalize their output take [`MaybeSession`] instead, which never
//! rejects.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts};

use crate::api::error::ApiError;
use crate::db::SessionRepository;
use crate::models::User;

/// Source of truth for session tokens. A trait seam so extractor behavior
/// is testable without a database.
pub trait SessionStore: Send + Sync + 'static {
    /// Resolve a token to its user, if the session exists.
    fn user_for_token(&self, token: &str) -> Option<User>;
}

impl SessionStore for SessionRepository {
    fn user_for_token(&self, token: &str) -> Option<User> {
        self.find_user(token).ok().flatten()
    }
}

/// The authenticated caller.
pub struct Session {
    pub user: User,
}

/// The caller's identity when present; `None` for anonymous requests.
pub struct MaybeSession(pub Option<User>);

/// Pull the bearer token out of the Authorization header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    Arc<dyn SessionStore>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = Arc::<dyn SessionStore>::from_ref(state);
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        let user = store.user_for_token(token).ok_or(ApiError::Unauthorized)?;

        Ok(Session { user })
    }
}

impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
    Arc<dyn SessionStore>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = Arc::<dyn SessionStore>::from_ref(state);
        let user = bearer_token(parts).and_then(|token| store.user_for_token(token));

        Ok(MaybeSession(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/mixes");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_extraction() {
        let parts = parts_with_auth(Some("Bearer abc123"));
        assert_eq!(bearer_token(&parts), Some("abc123"));
    }

    #[test]
    fn test_missing_or_malformed_header() {
        assert_eq!(bearer_token(&parts_with_auth(None)), None);
        assert_eq!(bearer_token(&parts_with_auth(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with_auth(Some("Bearer "))), None);
    }
}
