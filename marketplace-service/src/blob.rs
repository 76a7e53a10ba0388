//! Image storage for product photos and profile pictures.

use async_trait::async_trait;
use shared::RuleViolation;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// An uploaded file as received from a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores an image and returns the opaque path it can be served from.
    async fn store(&self, upload: &Upload, prefix: &str) -> AppResult<String>;

    /// Best-effort removal; failures are logged, never returned.
    async fn remove(&self, path: &str);
}

pub fn ensure_image(content_type: &str) -> Result<(), RuleViolation> {
    if content_type.starts_with("image/") {
        Ok(())
    } else {
        Err(RuleViolation::InvalidContentType {
            content_type: content_type.to_string(),
        })
    }
}

fn extension(file_name: &str) -> Option<&str> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Writes images into a local directory served under `/images`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(&self, upload: &Upload, prefix: &str) -> AppResult<String> {
        ensure_image(&upload.content_type)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(format!("cannot create image directory: {e}")))?;

        let file_name = match extension(&upload.file_name) {
            Some(ext) => format!("{prefix}_{}.{}", Uuid::new_v4(), ext.to_lowercase()),
            None => format!("{prefix}_{}", Uuid::new_v4()),
        };
        tokio::fs::write(self.root.join(&file_name), &upload.bytes)
            .await
            .map_err(|e| AppError::Internal(format!("cannot write image: {e}")))?;

        Ok(format!("images/{file_name}"))
    }

    async fn remove(&self, path: &str) {
        let Some(file_name) = path.strip_prefix("images/") else {
            warn!(path, "refusing to remove image outside the image directory");
            return;
        };
        if file_name.contains('/') || file_name.contains("..") {
            warn!(path, "refusing to remove image outside the image directory");
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.root.join(file_name)).await {
            warn!(path, error = %e, "failed to remove image");
        }
    }
}
