//! Livestream record and API views.
//!
//! A row exists only while the user's stream is live; the external video
//! provider owns the actual stream state. The row's job is to hold the
//! provider handle and to enforce the one-active-stream-per-user rule
//! through its unique user index.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::timestamp;

/// Local record of an active livestream (domain model).
///
/// `provider_id` and `stream_key` are filled in once the provider has
/// allocated the stream; a row without them is a reservation in flight.
#[derive(Debug, Clone)]
pub struct LiveStream {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub provider_id: Option<String>,
    pub stream_key: Option<String>,
    pub playback_url: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Stream descriptor returned to the stream's owner. The stream key is only
/// ever sent to the user who created the stream.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamView {
    pub id: String,
    pub user_id: i32,
    pub username: String,
    pub stream_key: String,
    pub playback_url: String,
    pub started_at: String,
}

impl StreamView {
    pub fn from_record(record: &LiveStream) -> Option<Self> {
        Some(Self {
            id: record.provider_id.clone()?,
            user_id: record.user_id,
            username: record.username.clone(),
            stream_key: record.stream_key.clone()?,
            playback_url: record.playback_url.clone().unwrap_or_default(),
            started_at: timestamp(&record.created_at),
        })
    }
}

/// Public descriptor of an active stream, as listed in the live directory.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveDirectoryEntry {
    pub id: String,
    pub user_id: i32,
    pub username: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_url: Option<String>,
}

/// Envelope for stream create responses.
#[derive(Debug, Serialize)]
pub struct StreamResponse {
    pub success: bool,
    pub stream: StreamView,
}
