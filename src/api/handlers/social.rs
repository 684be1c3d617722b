//! Social graph handlers: follow toggle and profiles.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::api::AppState;
use crate::api::auth::{MaybeSession, Session};
use crate::api::error::ApiError;
use crate::api::handlers::mixes::assemble_views;
use crate::db::ProfileChanges;
use crate::models::Profile;
use crate::models::profile::{FollowResponse, ProfileResponse, ProfileView};

/// POST /api/users/{id}/follow
///
/// Toggles the follow edge from the caller to the target user and returns
/// the new state. Self-follows are not special-cased.
pub async fn follow(
    State(state): State<AppState>,
    session: Session,
    Path(user_id): Path<i32>,
) -> Result<Json<FollowResponse>, ApiError> {
    state
        .users
        .find_by_id(user_id)?
        .ok_or(ApiError::NotFound("User"))?;

    let (following, followers_count) = state.profiles.toggle_follow(session.user.id, user_id)?;

    Ok(Json(FollowResponse {
        following,
        followers_count,
    }))
}

/// GET /api/profiles/{username}
///
/// Profile with follow counts, the caller's follow state, and the DJ's
/// public mixes.
pub async fn get_profile(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(username): Path<String>,
) -> Result<Json<ProfileView>, ApiError> {
    let profile = state
        .profiles
        .find_by_username(&username)?
        .ok_or(ApiError::NotFound("Profile"))?;

    let viewer = session.0.as_ref().map(|user| user.id);
    let view = assemble_profile(&state, &profile, viewer)?;

    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileBody {
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub genres: Option<Vec<String>>,
    pub location: Option<String>,
    pub equipment: Option<String>,
    pub social_links: Option<BTreeMap<String, String>>,
}

/// PATCH /api/profile
///
/// Partial update of the caller's own profile.
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<UpdateProfileBody>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let genres = match &body.genres {
        Some(genres) => {
            Some(serde_json::to_string(genres).map_err(|e| ApiError::Internal(e.to_string()))?)
        }
        None => None,
    };
    let social_links = match &body.social_links {
        Some(links) => {
            Some(serde_json::to_string(links).map_err(|e| ApiError::Internal(e.to_string()))?)
        }
        None => None,
    };

    let updated = state.profiles.update(
        session.user.id,
        ProfileChanges {
            bio: body.bio,
            avatar_url: body.avatar_url,
            cover_url: body.cover_url,
            genres,
            location: body.location,
            equipment: body.equipment,
            social_links,
            ..Default::default()
        },
    )?;

    if !updated {
        return Err(ApiError::NotFound("Profile"));
    }

    let profile = state
        .profiles
        .find_by_user_id(session.user.id)?
        .ok_or(ApiError::NotFound("Profile"))?;

    Ok(Json(ProfileResponse {
        success: true,
        profile: assemble_profile(&state, &profile, Some(session.user.id))?,
    }))
}

/// Assemble a full profile view: counts, follow state, public mixes.
fn assemble_profile(
    state: &AppState,
    profile: &Profile,
    viewer: Option<i32>,
) -> Result<ProfileView, ApiError> {
    let owner = state
        .users
        .find_by_id(profile.user_id)?
        .ok_or(ApiError::NotFound("User"))?;

    let followers_count = state.profiles.follower_count(profile.user_id)?;
    let following_count = state.profiles.following_count(profile.user_id)?;
    let is_following = match viewer {
        Some(viewer_id) => state.profiles.is_following(viewer_id, profile.user_id)?,
        None => false,
    };

    let mixes = state.mixes.list_public_by_user(profile.user_id)?;
    let mix_views = assemble_views(state, &mixes, viewer)?;

    Ok(ProfileView::assemble(
        profile,
        owner.display_name,
        followers_count,
        following_count,
        is_following,
        mix_views,
    ))
}
