//! Play-count handler with its cooldown gate.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use chrono::Utc;

use crate::api::AppState;
use crate::api::auth::MaybeSession;
use crate::api::error::ApiError;
use crate::models::mix::PlayResponse;

/// Minimum seconds between two counted plays of the same mix from the
/// same identifier.
const PLAY_COOLDOWN_SECS: i64 = 300;

/// The identifier a play is keyed on: the authenticated user when present,
/// otherwise the client address (trusting X-Forwarded-For when a proxy
/// set it).
fn play_identifier(viewer: Option<i32>, headers: &HeaderMap, addr: &SocketAddr) -> String {
    if let Some(user_id) = viewer {
        return format!("user:{}", user_id);
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded {
        Some(ip) => format!("ip:{}", ip),
        None => format!("ip:{}", addr.ip()),
    }
}

/// POST /api/mixes/{id}/play
///
/// Increments the mix's play counter unless the same identifier already
/// played it inside the cooldown window; the rejected case is reported,
/// not an error.
pub async fn play_mix(
    State(state): State<AppState>,
    session: MaybeSession,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(mix_id): Path<i32>,
) -> Result<Json<PlayResponse>, ApiError> {
    let mix = state
        .mixes
        .find_by_id(mix_id)?
        .ok_or(ApiError::NotFound("Mix"))?;

    let viewer = session.0.as_ref().map(|user| user.id);
    let identifier = play_identifier(viewer, &headers, &addr);

    if state
        .plays
        .recently_played(&identifier, mix_id, PLAY_COOLDOWN_SECS)?
    {
        return Ok(Json(PlayResponse {
            plays: mix.play_count,
            counted: false,
        }));
    }

    state.plays.record(&identifier, mix_id, Utc::now().naive_utc())?;
    let plays = state
        .mixes
        .increment_plays(mix_id)?
        .ok_or(ApiError::NotFound("Mix"))?;

    Ok(Json(PlayResponse {
        plays,
        counted: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_prefers_user() {
        let addr: SocketAddr = "192.0.2.1:9000".parse().unwrap();
        let headers = HeaderMap::new();
        assert_eq!(play_identifier(Some(7), &headers, &addr), "user:7");
    }

    #[test]
    fn test_identifier_falls_back_to_forwarded_then_peer() {
        let addr: SocketAddr = "192.0.2.1:9000".parse().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(play_identifier(None, &headers, &addr), "ip:203.0.113.9");

        let headers = HeaderMap::new();
        assert_eq!(play_identifier(None, &headers, &addr), "ip:192.0.2.1");
    }
}
