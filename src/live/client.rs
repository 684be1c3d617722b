//! HTTP client for the managed live-video provider.
//!
//! The provider owns the whole stream lifecycle (allocation, ingest status,
//! teardown); this client is a thin request/response wrapper. Streams are
//! tagged with the owning user through the provider's passthrough field so
//! listings can be filtered back to our users.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LiveConfig;

/// Errors from the live-video provider.
#[derive(Debug, Error)]
pub enum LiveError {
    #[error("Video provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Video provider rejected the request ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Owner metadata carried in the provider's passthrough field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamTag {
    pub user_id: i32,
    pub username: String,
}

impl StreamTag {
    pub fn encode(&self) -> String {
        // Serialization of two plain fields cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackId {
    pub id: String,
}

/// A live-stream resource as reported by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderStream {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub stream_key: Option<String>,
    #[serde(default)]
    pub playback_ids: Vec<PlaybackId>,
    #[serde(default)]
    pub passthrough: Option<String>,
}

impl ProviderStream {
    /// Whether the stream is currently ingesting.
    pub fn is_live(&self) -> bool {
        self.status == "active"
    }

    /// The owner tag, when the stream was created by us.
    pub fn tag(&self) -> Option<StreamTag> {
        self.passthrough.as_deref().and_then(StreamTag::decode)
    }

    /// First public playback id, when one exists.
    pub fn playback_id(&self) -> Option<&str> {
        self.playback_ids.first().map(|p| p.id.as_str())
    }
}

#[derive(Debug, Serialize)]
struct CreateStreamBody {
    playback_policy: Vec<&'static str>,
    passthrough: String,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// Thin client over the provider's live-stream resource.
#[derive(Clone)]
pub struct LiveClient {
    http: reqwest::Client,
    config: LiveConfig,
}

impl LiveClient {
    /// Create a new client from the configured token pair.
    pub fn new(config: LiveConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Ask the provider to allocate a new live stream tagged with the owner.
    pub async fn create_stream(&self, tag: &StreamTag) -> Result<ProviderStream, LiveError> {
        let body = CreateStreamBody {
            playback_policy: vec!["public"],
            passthrough: tag.encode(),
        };

        let response = self
            .http
            .post(self.endpoint("live-streams"))
            .basic_auth(&self.config.key_id, Some(&self.config.secret))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LiveError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let envelope: DataEnvelope<ProviderStream> = response.json().await?;
        Ok(envelope.data)
    }

    /// List all of our live-stream resources at the provider.
    pub async fn list_streams(&self) -> Result<Vec<ProviderStream>, LiveError> {
        let response = self
            .http
            .get(self.endpoint("live-streams"))
            .basic_auth(&self.config.key_id, Some(&self.config.secret))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LiveError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let envelope: DataEnvelope<Vec<ProviderStream>> = response.json().await?;
        Ok(envelope.data)
    }

    /// Delete a live-stream resource by provider id.
    pub async fn delete_stream(&self, stream_id: &str) -> Result<(), LiveError> {
        let response = self
            .http
            .delete(self.endpoint(&format!("live-streams/{}", stream_id)))
            .basic_auth(&self.config.key_id, Some(&self.config.secret))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LiveError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(status: &str, passthrough: Option<&str>) -> ProviderStream {
        ProviderStream {
            id: "st-1".into(),
            status: status.into(),
            stream_key: Some("key".into()),
            playback_ids: vec![PlaybackId { id: "pb-1".into() }],
            passthrough: passthrough.map(str::to_owned),
        }
    }

    #[test]
    fn test_tag_round_trip() {
        let tag = StreamTag {
            user_id: 42,
            username: "alice".into(),
        };
        assert_eq!(StreamTag::decode(&tag.encode()), Some(tag));
    }

    #[test]
    fn test_only_active_streams_are_live() {
        assert!(stream("active", None).is_live());
        assert!(!stream("idle", None).is_live());
        assert!(!stream("disabled", None).is_live());
    }

    #[test]
    fn test_tag_tolerates_foreign_passthrough() {
        assert!(stream("active", Some("not ours")).tag().is_none());
        let tagged = stream("active", Some(r#"{"user_id":1,"username":"a"}"#));
        assert_eq!(tagged.tag().map(|t| t.user_id), Some(1));
    }

    #[test]
    fn test_endpoint_joins_cleanly() {
        let client = LiveClient::new(LiveConfig {
            base_url: "https://api.example.com/video/v1/".into(),
            key_id: "k".into(),
            secret: "s".into(),
        });
        assert_eq!(
            client.endpoint("live-streams"),
            "https://api.example.com/video/v1/live-streams"
        );
    }
}
