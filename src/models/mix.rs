//! Mix and comment models plus their API view types.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::timestamp;
use crate::models::user::DjSummary;

/// An uploaded mix (domain model).
#[derive(Debug, Clone)]
pub struct Mix {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub audio_url: String,
    pub cover_url: Option<String>,
    pub genre: Option<String>,
    /// Duration in seconds.
    pub duration: i32,
    pub play_count: i32,
    pub is_public: bool,
    /// JSON array of tag strings, as stored.
    pub tags: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Mix {
    /// Decode the stored tag list. Malformed stored JSON yields no tags.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

/// A comment on a mix (domain model). `parent_id` is set for replies;
/// nesting is a single level deep.
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i32,
    pub mix_id: i32,
    pub user_id: i32,
    pub parent_id: Option<i32>,
    pub content: String,
    pub created_at: NaiveDateTime,
}

/// Per-caller engagement annotations computed at read time.
#[derive(Debug, Clone, Copy, Default)]
pub struct MixAnnotations {
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
}

/// Mix as returned by the API: the entity plus its DJ and the caller's
/// engagement view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixView {
    pub id: i32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub audio_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    pub duration: i32,
    pub plays: i32,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub created_at: String,
    pub dj: DjSummary,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
}

impl MixView {
    pub fn assemble(mix: &Mix, dj: DjSummary, notes: MixAnnotations) -> Self {
        Self {
            id: mix.id,
            title: mix.title.clone(),
            description: mix.description.clone(),
            audio_url: mix.audio_url.clone(),
            cover_url: mix.cover_url.clone(),
            genre: mix.genre.clone(),
            duration: mix.duration,
            plays: mix.play_count,
            is_public: mix.is_public,
            tags: mix.tag_list(),
            created_at: timestamp(&mix.created_at),
            dj,
            likes_count: notes.likes_count,
            comments_count: notes.comments_count,
            is_liked: notes.is_liked,
        }
    }
}

/// Comment as returned by the API, with author and the caller's like state.
/// Top-level comments carry their direct replies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: i32,
    pub content: String,
    pub created_at: String,
    pub author: DjSummary,
    pub likes_count: i64,
    pub is_liked: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<CommentView>,
}

impl CommentView {
    pub fn assemble(
        comment: &Comment,
        author: DjSummary,
        likes_count: i64,
        is_liked: bool,
    ) -> Self {
        Self {
            id: comment.id,
            content: comment.content.clone(),
            created_at: timestamp(&comment.created_at),
            author,
            likes_count,
            is_liked,
            replies: Vec::new(),
        }
    }
}

/// Envelope for mix create/update responses.
#[derive(Debug, Serialize)]
pub struct MixResponse {
    pub success: bool,
    pub mix: MixView,
}

/// Envelope for comment create responses.
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub success: bool,
    pub comment: CommentView,
}

/// Toggle result for likes on mixes and comments.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: i64,
}

/// Result of a play-count increment attempt. `counted` is false when the
/// cooldown window swallowed the play.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResponse {
    pub plays: i32,
    pub counted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mix(tags: Option<&str>) -> Mix {
        Mix {
            id: 7,
            user_id: 1,
            title: "Test Mix".into(),
            description: None,
            audio_url: "/a.mp3".into(),
            cover_url: None,
            genre: Some("house".into()),
            duration: 120,
            play_count: 0,
            is_public: true,
            tags: tags.map(str::to_owned),
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_tag_list_decodes_json_array() {
        let mix = sample_mix(Some(r#"["deep","vinyl"]"#));
        assert_eq!(mix.tag_list(), vec!["deep".to_string(), "vinyl".to_string()]);
    }

    #[test]
    fn test_tag_list_tolerates_garbage() {
        assert!(sample_mix(Some("not json")).tag_list().is_empty());
        assert!(sample_mix(None).tag_list().is_empty());
    }
}
