//! DJ profile model and API views.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::timestamp;
use crate::models::mix::MixView;

/// The social-identity extension of a user account, created alongside it at
/// registration. Follower membership lives in the `follows` table.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    /// JSON array of genre tags, as stored.
    pub genres: Option<String>,
    pub location: Option<String>,
    pub equipment: Option<String>,
    /// JSON object mapping platform name to URL, as stored.
    pub social_links: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Profile {
    pub fn genre_list(&self) -> Vec<String> {
        self.genres
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    pub fn social_link_map(&self) -> BTreeMap<String, String> {
        self.social_links
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

/// Profile as returned by the API, with counts, the caller's follow state,
/// and the DJ's public mixes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user_id: i32,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    pub social_links: BTreeMap<String, String>,
    pub created_at: String,
    pub followers_count: i64,
    pub following_count: i64,
    pub is_following: bool,
    pub mixes: Vec<MixView>,
}

impl ProfileView {
    pub fn assemble(
        profile: &Profile,
        display_name: String,
        followers_count: i64,
        following_count: i64,
        is_following: bool,
        mixes: Vec<MixView>,
    ) -> Self {
        Self {
            user_id: profile.user_id,
            username: profile.username.clone(),
            display_name,
            bio: profile.bio.clone(),
            avatar_url: profile.avatar_url.clone(),
            cover_url: profile.cover_url.clone(),
            genres: profile.genre_list(),
            location: profile.location.clone(),
            equipment: profile.equipment.clone(),
            social_links: profile.social_link_map(),
            created_at: timestamp(&profile.created_at),
            followers_count,
            following_count,
            is_following,
            mixes,
        }
    }
}

/// Envelope for profile update responses.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: ProfileView,
}

/// Toggle result for follow/unfollow.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub following: bool,
    pub followers_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_social_link_map_decodes_object() {
        let profile = Profile {
            id: 1,
            user_id: 1,
            username: "alice".into(),
            bio: None,
            avatar_url: None,
            cover_url: None,
            genres: Some(r#"["techno"]"#.into()),
            location: None,
            equipment: None,
            social_links: Some(r#"{"soundcloud":"https://soundcloud.com/alice"}"#.into()),
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        };
        assert_eq!(profile.genre_list(), vec!["techno".to_string()]);
        assert_eq!(
            profile.social_link_map().get("soundcloud").map(String::as_str),
            Some("https://soundcloud.com/alice")
        );
    }
}
