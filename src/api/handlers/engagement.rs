//! Engagement handlers: like toggles and comments.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;

use crate::api::AppState;
use crate::api::auth::{MaybeSession, Session};
use crate::api::error::ApiError;
use crate::api::handlers::dj_summaries;
use crate::db::NewComment;
use crate::models::mix::{CommentResponse, CommentView, LikeResponse};

/// Minimum seconds between two comments from the same author.
const COMMENT_COOLDOWN_SECS: i64 = 10;

/// POST /api/mixes/{id}/like
///
/// Toggles the caller's like on a mix and returns the new state.
pub async fn like_mix(
    State(state): State<AppState>,
    session: Session,
    Path(mix_id): Path<i32>,
) -> Result<Json<LikeResponse>, ApiError> {
    state
        .mixes
        .find_by_id(mix_id)?
        .ok_or(ApiError::NotFound("Mix"))?;

    let (liked, likes_count) = state.mixes.toggle_like(session.user.id, mix_id)?;

    Ok(Json(LikeResponse { liked, likes_count }))
}

/// POST /api/comments/{id}/like
pub async fn like_comment(
    State(state): State<AppState>,
    session: Session,
    Path(comment_id): Path<i32>,
) -> Result<Json<LikeResponse>, ApiError> {
    state
        .comments
        .find_by_id(comment_id)?
        .ok_or(ApiError::NotFound("Comment"))?;

    let (liked, likes_count) = state.comments.toggle_like(session.user.id, comment_id)?;

    Ok(Json(LikeResponse { liked, likes_count }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentBody {
    pub content: String,
    pub parent_id: Option<i32>,
}

/// POST /api/mixes/{id}/comments
///
/// Creates a top-level comment or a reply. Replies nest exactly one level:
/// a reply to a reply is rejected. A second comment from the same author
/// inside the cooldown window is rate-limited.
pub async fn create_comment(
    State(state): State<AppState>,
    session: Session,
    Path(mix_id): Path<i32>,
    Json(body): Json<CreateCommentBody>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("content is required".into()));
    }

    state
        .mixes
        .find_by_id(mix_id)?
        .ok_or(ApiError::NotFound("Mix"))?;

    if let Some(parent_id) = body.parent_id {
        let parent = state
            .comments
            .find_by_id(parent_id)?
            .ok_or(ApiError::NotFound("Comment"))?;
        if parent.mix_id != mix_id {
            return Err(ApiError::Validation(
                "parent comment belongs to a different mix".into(),
            ));
        }
        if parent.parent_id.is_some() {
            return Err(ApiError::Validation("cannot reply to a reply".into()));
        }
    }

    if state
        .comments
        .recently_commented(session.user.id, COMMENT_COOLDOWN_SECS)?
    {
        return Err(ApiError::RateLimited("You are commenting too quickly"));
    }

    let comment = state.comments.create(&NewComment {
        mix_id,
        user_id: session.user.id,
        parent_id: body.parent_id,
        content,
        created_at: Utc::now().naive_utc(),
    })?;

    let authors = dj_summaries(&state, &[session.user.id])?;
    let author = authors
        .get(&session.user.id)
        .cloned()
        .ok_or(ApiError::Unauthorized)?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            success: true,
            comment: CommentView::assemble(&comment, author, 0, false),
        }),
    ))
}

/// GET /api/mixes/{id}/comments
///
/// Top-level comments newest first, each with its direct replies oldest
/// first.
pub async fn list_comments(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(mix_id): Path<i32>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    state
        .mixes
        .find_by_id(mix_id)?
        .ok_or(ApiError::NotFound("Mix"))?;

    let viewer = session.0.as_ref().map(|user| user.id);

    let top_level = state.comments.list_top_level(mix_id)?;
    let top_ids: Vec<i32> = top_level.iter().map(|c| c.id).collect();
    let replies = state.comments.list_replies(&top_ids)?;

    let all_ids: Vec<i32> = top_ids
        .iter()
        .copied()
        .chain(replies.iter().map(|c| c.id))
        .collect();
    let author_ids: Vec<i32> = top_level
        .iter()
        .chain(replies.iter())
        .map(|c| c.user_id)
        .collect();

    let like_counts = state.comments.like_counts_for(&all_ids)?;
    let liked: Vec<i32> = match viewer {
        Some(user_id) => state.comments.liked_set(user_id, &all_ids)?,
        None => Vec::new(),
    };
    let authors = dj_summaries(&state, &author_ids)?;

    let view_of = |comment: &crate::models::Comment| -> Option<CommentView> {
        let author = authors.get(&comment.user_id).cloned()?;
        Some(CommentView::assemble(
            comment,
            author,
            like_counts.get(&comment.id).copied().unwrap_or(0),
            liked.contains(&comment.id),
        ))
    };

    let mut by_parent: HashMap<i32, Vec<CommentView>> = HashMap::new();
    for reply in &replies {
        if let (Some(parent_id), Some(view)) = (reply.parent_id, view_of(reply)) {
            by_parent.entry(parent_id).or_default().push(view);
        }
    }

    let mut views = Vec::with_capacity(top_level.len());
    for comment in &top_level {
        let Some(mut view) = view_of(comment) else {
            tracing::warn!("comment {} has no author profile; skipping", comment.id);
            continue;
        };
        view.replies = by_parent.remove(&comment.id).unwrap_or_default();
        views.push(view);
    }

    Ok(Json(views))
}
