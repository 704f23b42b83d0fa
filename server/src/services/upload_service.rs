use std::path::Path;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

/// File extension for an accepted content type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

pub async fn save_upload(config: &Config, content_type: &str, data: &[u8]) -> AppResult<UploadedFile> {
    let extension = extension_for(content_type).ok_or_else(|| {
        AppError::ValidationError(format!(
            "Unsupported file type '{}'. Allowed: jpeg, png, webp, gif, pdf",
            content_type
        ))
    })?;
    if data.is_empty() {
        return Err(AppError::ValidationError("Uploaded file is empty".to_string()));
    }
    if data.len() > config.max_upload_bytes {
        return Err(AppError::ValidationError(format!(
            "File exceeds the {} byte limit",
            config.max_upload_bytes
        )));
    }

    let file_name = format!("{}.{}", Uuid::new_v4(), extension);
    write_file(&config.upload_dir, &file_name, data).await?;

    let url = format!("{}/{}", config.public_upload_url.trim_end_matches('/'), file_name);
    info!(file = %file_name, size = data.len(), "Stored upload");
    Ok(UploadedFile {
        url,
        content_type: content_type.to_string(),
        size: data.len(),
    })
}

async fn write_file(dir: &Path, file_name: &str, data: &[u8]) -> AppResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Cannot create upload dir: {}", e)))?;
    tokio::fs::write(dir.join(file_name), data)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Cannot store upload: {}", e)))
}
