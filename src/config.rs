//! Environment-backed application configuration.

use std::path::PathBuf;

use crate::social::SocialProviderConfig;

/// Token pair and endpoint for the live-video provider.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub base_url: String,
    pub key_id: String,
    pub secret: String,
}

/// Application configuration read from the environment (after `dotenvy`
/// has loaded any `.env` file).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Public URL of the app, used when building playback links.
    pub app_url: String,
    /// Directory uploaded audio and cover files are written under.
    pub media_dir: PathBuf,
    pub live: LiveConfig,
    pub social_providers: Vec<SocialProviderConfig>,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through a lookup function. Missing values fall
    /// back to development defaults; missing credentials are warned about
    /// rather than fatal so the API can run without the live/social
    /// integrations configured.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let app_url = get("APP_URL").unwrap_or_else(|| "http://localhost:3000".to_string());
        let media_dir = PathBuf::from(get("MEDIA_DIR").unwrap_or_else(|| "media".to_string()));

        let live = LiveConfig {
            base_url: get("LIVE_API_BASE")
                .unwrap_or_else(|| "https://api.mux.com/video/v1".to_string()),
            key_id: get("LIVE_API_KEY_ID").unwrap_or_default(),
            secret: get("LIVE_API_SECRET").unwrap_or_default(),
        };
        if live.key_id.is_empty() || live.secret.is_empty() {
            tracing::warn!("LIVE_API_KEY_ID / LIVE_API_SECRET not set; livestreams will fail");
        }

        let mut social_providers = Vec::new();
        for (name, userinfo_url) in [
            ("google", "https://www.googleapis.com/oauth2/v3/userinfo"),
            ("facebook", "https://graph.facebook.com/me?fields=email,name,picture"),
        ] {
            let prefix = format!("OAUTH_{}", name.to_uppercase());
            let client_id = get(&format!("{}_CLIENT_ID", prefix));
            let client_secret = get(&format!("{}_CLIENT_SECRET", prefix));
            match (client_id, client_secret) {
                (Some(client_id), Some(client_secret)) => {
                    social_providers.push(SocialProviderConfig {
                        name: name.to_string(),
                        client_id,
                        client_secret,
                        userinfo_url: userinfo_url.to_string(),
                    });
                }
                _ => {
                    tracing::warn!("OAuth client pair for {} not set; provider disabled", name);
                }
            }
        }

        Self {
            app_url,
            media_dir,
            live,
            social_providers,
        }
    }

    /// Playback link for a provider playback id.
    pub fn playback_url(&self, playback_id: &str) -> String {
        format!("{}/live/{}", self.app_url.trim_end_matches('/'), playback_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.app_url, "http://localhost:3000");
        assert_eq!(config.media_dir, PathBuf::from("media"));
        assert!(config.social_providers.is_empty());
    }

    #[test]
    fn test_configured_providers_are_picked_up() {
        let mut env = HashMap::new();
        env.insert("APP_URL", "https://backspin.example/");
        env.insert("OAUTH_GOOGLE_CLIENT_ID", "gid");
        env.insert("OAUTH_GOOGLE_CLIENT_SECRET", "gsecret");

        let config = AppConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.social_providers.len(), 1);
        assert_eq!(config.social_providers[0].name, "google");
        assert_eq!(
            config.playback_url("pb-1"),
            "https://backspin.example/live/pb-1"
        );
    }
}
