//! Livestream lifecycle handlers.
//!
//! The provider owns the stream resource; locally we only hold the user's
//! active-stream slot. The slot is reserved before the provider is asked to
//! allocate anything, so a duplicate create is refused without provider
//! traffic, and a provider failure releases the slot again.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::api::AppState;
use crate::api::auth::Session;
use crate::api::error::ApiError;
use crate::live::StreamTag;
use crate::models::stream::{LiveDirectoryEntry, StreamResponse, StreamView};

/// POST /api/live
pub async fn create_stream(
    State(state): State<AppState>,
    session: Session,
) -> Result<(StatusCode, Json<StreamResponse>), ApiError> {
    let (user, username) = state
        .users
        .find_with_username(session.user.id)?
        .ok_or(ApiError::Unauthorized)?;

    let slot = state
        .streams
        .try_reserve(user.id, &username)?
        .ok_or_else(|| ApiError::Validation("You already have an active stream".into()))?;

    let tag = StreamTag {
        user_id: user.id,
        username: username.clone(),
    };

    let provider_stream = match state.live.create_stream(&tag).await {
        Ok(stream) => stream,
        Err(err) => {
            if let Err(release_err) = state.streams.release(slot) {
                tracing::error!("failed to release stream slot {}: {}", slot, release_err);
            }
            return Err(err.into());
        }
    };

    let stream_key = provider_stream.stream_key.clone().unwrap_or_default();
    let playback_url = provider_stream
        .playback_id()
        .map(|id| state.config.playback_url(id))
        .unwrap_or_default();

    state
        .streams
        .fill(slot, &provider_stream.id, &stream_key, &playback_url)?;

    let record = state
        .streams
        .find_by_user(user.id)?
        .ok_or_else(|| ApiError::Internal("stream record vanished after create".into()))?;
    let stream = StreamView::from_record(&record)
        .ok_or_else(|| ApiError::Internal("stream record is missing its provider handle".into()))?;

    Ok((
        StatusCode::CREATED,
        Json(StreamResponse {
            success: true,
            stream,
        }),
    ))
}

/// GET /api/live
///
/// Currently-live streams, straight from the provider, filtered to the
/// ones tagged with one of our users.
pub async fn list_streams(
    State(state): State<AppState>,
    _session: Session,
) -> Result<Json<Vec<LiveDirectoryEntry>>, ApiError> {
    let streams = state.live.list_streams().await?;

    let entries = streams
        .into_iter()
        .filter(|stream| stream.is_live())
        .filter_map(|stream| {
            let tag = stream.tag()?;
            Some(LiveDirectoryEntry {
                playback_url: stream
                    .playback_id()
                    .map(|id| state.config.playback_url(id)),
                id: stream.id,
                user_id: tag.user_id,
                username: tag.username,
                status: stream.status,
            })
        })
        .collect();

    Ok(Json(entries))
}

/// DELETE /api/live/{id}
///
/// Owner only. Deletes the provider resource, then frees the local slot.
pub async fn delete_stream(
    State(state): State<AppState>,
    session: Session,
    Path(stream_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state
        .streams
        .find_by_provider(&stream_id)?
        .ok_or(ApiError::NotFound("Stream"))?;

    if record.user_id != session.user.id {
        return Err(ApiError::Forbidden);
    }

    state.live.delete_stream(&stream_id).await?;
    state.streams.release(record.id)?;

    Ok(Json(json!({ "success": true })))
}
