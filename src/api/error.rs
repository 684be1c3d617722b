//! API error taxonomy and HTTP mapping.
//!
//! Every handler failure funnels into [`ApiError`], which maps onto an HTTP
//! status and a `{success: false, message}` JSON body. Internal and upstream
//! failures keep their detail server-side: the detail is logged and the
//! client gets a generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::crypto::PasswordError;
use crate::db::{AccountRepoError, ContentRepoError};
use crate::live::LiveError;
use crate::social::SocialError;

/// API errors that can be returned to clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// No usable session on a request that needs one.
    #[error("Missing or invalid session")]
    Unauthorized,

    /// Valid session, but the caller does not own the target.
    #[error("You do not have permission to do that")]
    Forbidden,

    /// Referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Cooldown window has not elapsed.
    #[error("{0}")]
    RateLimited(&'static str),

    /// External service failure. The detail is logged, never returned.
    #[error("Upstream service error")]
    Upstream(String),

    /// Database or other internal failure. Detail logged, never returned.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Upstream(detail) => tracing::error!("upstream failure: {}", detail),
            ApiError::Internal(detail) => tracing::error!("internal failure: {}", detail),
            _ => {}
        }

        let body = ErrorBody {
            success: false,
            message: self.to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<AccountRepoError> for ApiError {
    fn from(err: AccountRepoError) -> Self {
        match err {
            AccountRepoError::EmailTaken(_) | AccountRepoError::UsernameTaken(_) => {
                ApiError::Validation(err.to_string())
            }
            AccountRepoError::Database(_) | AccountRepoError::Pool(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<ContentRepoError> for ApiError {
    fn from(err: ContentRepoError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<LiveError> for ApiError {
    fn from(err: LiveError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<SocialError> for ApiError {
    fn from(err: SocialError) -> Self {
        match err {
            SocialError::UnknownProvider(_) | SocialError::MissingEmail => {
                ApiError::Validation(err.to_string())
            }
            SocialError::Rejected(_) => ApiError::Unauthorized,
            SocialError::Transport(_) => ApiError::Upstream(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("Mix").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::RateLimited("slow down").status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_is_not_leaked() {
        let message = ApiError::Internal("database exploded at row 7".into()).to_string();
        assert_eq!(message, "Internal server error");

        let message = ApiError::Upstream("provider 503".into()).to_string();
        assert_eq!(message, "Upstream service error");
    }

    #[test]
    fn test_response_carries_status() {
        let response = ApiError::NotFound("Mix").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
