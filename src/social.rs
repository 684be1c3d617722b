//! Social sign-in verification against OAuth provider userinfo endpoints.
//!
//! The browser-side OAuth dance happens in the client; the API receives the
//! provider name plus the access token the client obtained and verifies it
//! by fetching the provider's userinfo resource. First sign-in creates a
//! passwordless account.

use serde::Deserialize;
use thiserror::Error;

/// A configured OAuth provider (client id/secret pair from the
/// environment plus its fixed userinfo endpoint).
#[derive(Debug, Clone)]
pub struct SocialProviderConfig {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub userinfo_url: String,
}

/// Errors from social sign-in verification.
#[derive(Debug, Error)]
pub enum SocialError {
    #[error("Unknown social provider: {0}")]
    UnknownProvider(String),

    #[error("Provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provider rejected the access token ({0})")]
    Rejected(u16),

    #[error("Provider account has no email address")]
    MissingEmail,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    name: Option<String>,
    // Google reports a plain URL; other providers nest an object here.
    picture: Option<serde_json::Value>,
}

/// Identity extracted from a verified provider account.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Client verifying provider access tokens.
#[derive(Clone)]
pub struct SocialClient {
    http: reqwest::Client,
    providers: Vec<SocialProviderConfig>,
}

impl SocialClient {
    pub fn new(providers: Vec<SocialProviderConfig>) -> Self {
        Self {
            http: reqwest::Client::new(),
            providers,
        }
    }

    /// Look up a configured provider by name.
    pub fn provider(&self, name: &str) -> Option<&SocialProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Verify an access token by fetching the provider's userinfo resource.
    pub async fn verify(
        &self,
        provider: &str,
        access_token: &str,
    ) -> Result<VerifiedIdentity, SocialError> {
        let config = self
            .provider(provider)
            .ok_or_else(|| SocialError::UnknownProvider(provider.to_string()))?;

        let response = self
            .http
            .get(&config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SocialError::Rejected(response.status().as_u16()));
        }

        let info: UserInfo = response.json().await?;
        let email = info.email.ok_or(SocialError::MissingEmail)?;
        let display_name = info.name.unwrap_or_else(|| email.clone());
        let avatar_url = match info.picture {
            Some(serde_json::Value::String(url)) => Some(url),
            _ => None,
        };

        Ok(VerifiedIdentity {
            email,
            display_name,
            avatar_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_rejected_without_io() {
        let client = SocialClient::new(vec![SocialProviderConfig {
            name: "google".into(),
            client_id: "id".into(),
            client_secret: "secret".into(),
            userinfo_url: "https://example.com/userinfo".into(),
        }]);

        assert!(client.provider("google").is_some());
        assert!(client.provider("myspace").is_none());
    }
}
