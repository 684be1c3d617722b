//! Account handlers: register, login, social sign-in, session info.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::auth::Session;
use crate::api::error::ApiError;
use crate::api::AppState;
use crate::crypto::hash_password;
use crate::db::NewUser;
use crate::db::repository::AccountRepoError;
use crate::models::user::{DjSummary, Role, SessionResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

/// POST /api/auth/register
///
/// Creates a user with its profile and opens a session.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let username = body.username.trim();
    let email = body.email.trim();

    if username.is_empty() || email.is_empty() || body.password.is_empty() {
        return Err(ApiError::Validation(
            "username, email and password are required".into(),
        ));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("email is not valid".into()));
    }

    // Admin accounts come from the CLI, never from self-registration.
    let role = match body.role.unwrap_or(Role::User) {
        Role::Admin => Role::User,
        other => other,
    };

    let password_hash = hash_password(&body.password)?;

    let (user, profile) = state.users.register(
        &NewUser {
            email,
            display_name: username,
            avatar_url: None,
            password_hash: Some(&password_hash),
            role: role.as_str(),
        },
        username,
    )?;

    let token = state.sessions.create(user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            success: true,
            token,
            user: DjSummary::new(&user, profile.username),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    /// Email or profile username.
    pub login: String,
    pub password: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = state
        .users
        .find_by_login(body.login.trim())?
        .filter(|user| user.verify_password(&body.password))
        .ok_or(ApiError::Unauthorized)?;

    let (_, username) = state
        .users
        .find_with_username(user.id)?
        .ok_or_else(|| ApiError::Internal(format!("user {} has no profile", user.id)))?;

    let token = state.sessions.create(user.id)?;

    Ok(Json(SessionResponse {
        success: true,
        token,
        user: DjSummary::new(&user, username),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialBody {
    pub provider: String,
    pub access_token: String,
}

/// POST /api/auth/social
///
/// Verifies a provider access token and signs the account in, creating a
/// passwordless user on first sign-in.
pub async fn social_login(
    State(state): State<AppState>,
    Json(body): Json<SocialBody>,
) -> Result<Json<SessionResponse>, ApiError> {
    let identity = state.social.verify(&body.provider, &body.access_token).await?;

    let (user, username) = match state.users.find_by_email(&identity.email)? {
        Some(user) => {
            let (_, username) = state
                .users
                .find_with_username(user.id)?
                .ok_or_else(|| ApiError::Internal(format!("user {} has no profile", user.id)))?;
            (user, username)
        }
        None => {
            let (user, profile) = register_social_account(&state, &identity)?;
            (user, profile)
        }
    };

    let token = state.sessions.create(user.id)?;

    Ok(Json(SessionResponse {
        success: true,
        token,
        user: DjSummary::new(&user, username),
    }))
}

/// Create a passwordless account for a verified social identity, deriving
/// a free username from the email local part.
fn register_social_account(
    state: &AppState,
    identity: &crate::social::VerifiedIdentity,
) -> Result<(crate::models::User, String), ApiError> {
    let base: String = identity
        .email
        .split('@')
        .next()
        .unwrap_or("dj")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let base = if base.is_empty() { "dj".to_string() } else { base };

    for attempt in 0..32 {
        let candidate = if attempt == 0 {
            base.clone()
        } else {
            format!("{}{}", base, attempt)
        };

        let result = state.users.register(
            &NewUser {
                email: &identity.email,
                display_name: &identity.display_name,
                avatar_url: identity.avatar_url.as_deref(),
                password_hash: None,
                role: Role::User.as_str(),
            },
            &candidate,
        );

        match result {
            Ok((user, profile)) => return Ok((user, profile.username)),
            Err(AccountRepoError::UsernameTaken(_)) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(ApiError::Internal(format!(
        "could not find a free username for {}",
        identity.email
    )))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<DjSummary>, ApiError> {
    let (user, username) = state
        .users
        .find_with_username(session.user.id)?
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(DjSummary::new(&user, username)))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    _session: Session,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(ApiError::Unauthorized)?;

    state.sessions.delete(token)?;

    Ok(Json(json!({ "success": true })))
}
