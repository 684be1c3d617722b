//! Mix lifecycle handlers: create, feed, detail, update, delete.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::AppState;
use crate::api::auth::{MaybeSession, Session};
use crate::api::error::ApiError;
use crate::api::handlers::dj_summaries;
use crate::db::{MixChanges, NewMix};
use crate::models::Mix;
use crate::models::mix::{MixAnnotations, MixResponse, MixView};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMixBody {
    pub title: String,
    pub description: Option<String>,
    pub audio_url: String,
    pub cover_url: Option<String>,
    pub genre: Option<String>,
    pub duration: Option<i32>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// POST /api/mixes
///
/// Title, audio URL and duration are required; visibility defaults to
/// public and the play counter starts at zero.
pub async fn create_mix(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateMixBody>,
) -> Result<(StatusCode, Json<MixResponse>), ApiError> {
    let title = body.title.trim();
    let audio_url = body.audio_url.trim();

    if title.is_empty() || audio_url.is_empty() {
        return Err(ApiError::Validation("title and audioUrl are required".into()));
    }
    let duration = match body.duration {
        Some(secs) if secs > 0 => secs,
        _ => return Err(ApiError::Validation("duration must be positive".into())),
    };

    let tags = match &body.tags {
        Some(tags) => Some(
            serde_json::to_string(tags)
                .map_err(|e| ApiError::Internal(e.to_string()))?,
        ),
        None => None,
    };

    let mix = state.mixes.create(&NewMix {
        user_id: session.user.id,
        title,
        description: body.description.as_deref(),
        audio_url,
        cover_url: body.cover_url.as_deref(),
        genre: body.genre.as_deref(),
        duration,
        is_public: body.is_public.unwrap_or(true),
        tags,
    })?;

    let view = annotated_view(&state, &mix, Some(session.user.id))?;

    Ok((
        StatusCode::CREATED,
        Json(MixResponse {
            success: true,
            mix: view,
        }),
    ))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/mixes
///
/// Public mixes newest first, annotated per item with the caller's like
/// state and current aggregate counts. Counts are computed at read time.
pub async fn feed(
    State(state): State<AppState>,
    session: MaybeSession,
    Query(params): Query<FeedParams>,
) -> Result<Json<Vec<MixView>>, ApiError> {
    let offset = params.offset.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or(50).clamp(1, 100);
    let viewer = session.0.as_ref().map(|user| user.id);

    let mixes = state.mixes.list_public(offset, limit)?;
    let views = assemble_views(&state, &mixes, viewer)?;

    Ok(Json(views))
}

/// GET /api/mixes/{id}
///
/// Private mixes are visible to their owner only and read as absent to
/// everyone else.
pub async fn get_mix(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(mix_id): Path<i32>,
) -> Result<Json<MixView>, ApiError> {
    let viewer = session.0.as_ref().map(|user| user.id);

    let mix = state
        .mixes
        .find_by_id(mix_id)?
        .filter(|mix| mix.is_public || viewer == Some(mix.user_id))
        .ok_or(ApiError::NotFound("Mix"))?;

    Ok(Json(annotated_view(&state, &mix, viewer)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMixBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub audio_url: Option<String>,
    pub cover_url: Option<String>,
    pub genre: Option<String>,
    pub duration: Option<i32>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// PATCH /api/mixes/{id}
///
/// Owner only. Only supplied fields are changed.
pub async fn update_mix(
    State(state): State<AppState>,
    session: Session,
    Path(mix_id): Path<i32>,
    Json(body): Json<UpdateMixBody>,
) -> Result<Json<MixResponse>, ApiError> {
    let mix = state
        .mixes
        .find_by_id(mix_id)?
        .ok_or(ApiError::NotFound("Mix"))?;

    if mix.user_id != session.user.id {
        return Err(ApiError::Forbidden);
    }

    if body.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::Validation("title cannot be empty".into()));
    }
    if body.duration.is_some_and(|secs| secs <= 0) {
        return Err(ApiError::Validation("duration must be positive".into()));
    }

    let tags = match &body.tags {
        Some(tags) => Some(
            serde_json::to_string(tags)
                .map_err(|e| ApiError::Internal(e.to_string()))?,
        ),
        None => None,
    };

    state.mixes.update(
        mix_id,
        MixChanges {
            title: body.title,
            description: body.description,
            audio_url: body.audio_url,
            cover_url: body.cover_url,
            genre: body.genre,
            duration: body.duration,
            is_public: body.is_public,
            tags,
            ..Default::default()
        },
    )?;

    let mix = state
        .mixes
        .find_by_id(mix_id)?
        .ok_or(ApiError::NotFound("Mix"))?;

    Ok(Json(MixResponse {
        success: true,
        mix: annotated_view(&state, &mix, Some(session.user.id))?,
    }))
}

/// DELETE /api/mixes/{id}
///
/// Owner only; irreversible.
pub async fn delete_mix(
    State(state): State<AppState>,
    session: Session,
    Path(mix_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let mix = state
        .mixes
        .find_by_id(mix_id)?
        .ok_or(ApiError::NotFound("Mix"))?;

    if mix.user_id != session.user.id {
        return Err(ApiError::Forbidden);
    }

    state.mixes.delete(mix_id)?;

    Ok(Json(json!({ "success": true })))
}

/// Assemble the annotated view for a single mix.
pub(super) fn annotated_view(
    state: &AppState,
    mix: &Mix,
    viewer: Option<i32>,
) -> Result<MixView, ApiError> {
    let notes = state.mixes.annotations_for(&[mix.id], viewer)?;
    let authors = dj_summaries(state, &[mix.user_id])?;
    let dj = authors
        .get(&mix.user_id)
        .cloned()
        .ok_or_else(|| ApiError::Internal(format!("mix {} has no author profile", mix.id)))?;

    Ok(MixView::assemble(
        mix,
        dj,
        notes.get(&mix.id).copied().unwrap_or_default(),
    ))
}

/// Assemble annotated views for a page of mixes with three batch queries.
pub(super) fn assemble_views(
    state: &AppState,
    mixes: &[Mix],
    viewer: Option<i32>,
) -> Result<Vec<MixView>, ApiError> {
    let mix_ids: Vec<i32> = mixes.iter().map(|m| m.id).collect();
    let author_ids: Vec<i32> = mixes.iter().map(|m| m.user_id).collect();

    let notes = state.mixes.annotations_for(&mix_ids, viewer)?;
    let authors = dj_summaries(state, &author_ids)?;

    let mut views = Vec::with_capacity(mixes.len());
    for mix in mixes {
        let Some(dj) = authors.get(&mix.user_id).cloned() else {
            tracing::warn!("mix {} has no author profile; skipping", mix.id);
            continue;
        };
        let note: MixAnnotations = notes.get(&mix.id).copied().unwrap_or_default();
        views.push(MixView::assemble(mix, dj, note));
    }

    Ok(views)
}
