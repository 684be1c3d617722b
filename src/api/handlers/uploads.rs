//! Upload handler for mix audio and cover files.

use std::path::Path as FsPath;

use axum::Json;
use axum::extract::{Multipart, State};
use serde::Serialize;

use crate::api::AppState;
use crate::api::auth::Session;
use crate::api::error::ApiError;
use crate::crypto::generate_token;

/// Cover used when no cover was uploaded or the cover write failed.
const DEFAULT_COVER_URL: &str = "/media/covers/default.jpg";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub audio_url: String,
    pub cover_url: String,
}

/// Pick a safe file extension from the client's filename.
fn extension_of(file_name: Option<&str>, fallback: &str) -> String {
    file_name
        .and_then(|name| FsPath::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(fallback)
        .to_ascii_lowercase()
}

/// POST /api/uploads
///
/// Multipart body with an `audio` field and an optional `cover` field.
/// The audio write must succeed; a failed cover write degrades to the
/// default cover instead of failing the request.
pub async fn upload(
    State(state): State<AppState>,
    _session: Session,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut audio_url: Option<String> = None;
    let mut cover_url: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let ext = match name.as_str() {
            "audio" => extension_of(field.file_name(), "mp3"),
            "cover" => extension_of(field.file_name(), "jpg"),
            _ => continue,
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("failed to read {} field: {}", name, e)))?;
        if bytes.is_empty() {
            continue;
        }

        let subdir = if name == "audio" { "audio" } else { "covers" };
        let file_name = format!("{}.{}", generate_token(), ext);
        let dir = state.config.media_dir.join(subdir);
        let path = dir.join(&file_name);

        let write = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&path, &bytes).await
        };

        match (name.as_str(), write.await) {
            ("audio", Ok(())) => {
                audio_url = Some(format!("/media/audio/{}", file_name));
            }
            ("audio", Err(e)) => {
                return Err(ApiError::Internal(format!(
                    "failed to store audio upload: {}",
                    e
                )));
            }
            ("cover", Ok(())) => {
                cover_url = Some(format!("/media/covers/{}", file_name));
            }
            ("cover", Err(e)) => {
                // The mix can live with the default cover.
                tracing::warn!("cover upload failed, using default cover: {}", e);
            }
            _ => {}
        }
    }

    let audio_url = audio_url.ok_or_else(|| ApiError::Validation("audio file is required".into()))?;

    Ok(Json(UploadResponse {
        success: true,
        audio_url,
        cover_url: cover_url.unwrap_or_else(|| DEFAULT_COVER_URL.to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_sanitizing() {
        assert_eq!(extension_of(Some("set.MP3"), "mp3"), "mp3");
        assert_eq!(extension_of(Some("cover.jpeg"), "jpg"), "jpeg");
        assert_eq!(extension_of(Some("noext"), "mp3"), "mp3");
        assert_eq!(extension_of(Some("track.mp3 final"), "mp3"), "mp3");
        assert_eq!(extension_of(None, "jpg"), "jpg");
    }
}
