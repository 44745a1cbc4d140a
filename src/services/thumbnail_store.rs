//! Byte storage for thumbnails, addressed by key.
//!
//! Injected into the ingest service so the same upload logic runs against
//! disk or memory without any process-wide state.

use async_trait::async_trait;
use bytes::Bytes;
use std::{collections::HashMap, io, path::PathBuf};
use thiserror::Error;
use tokio::{fs, sync::RwLock};

#[derive(Debug, Error)]
pub enum ThumbnailStoreError {
    #[error("invalid thumbnail key `{0}`")]
    InvalidKey(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub media_type: String,
    pub data: Bytes,
}

#[async_trait]
pub trait ThumbnailStore: Send + Sync {
    async fn put(&self, key: &str, thumbnail: Thumbnail) -> Result<(), ThumbnailStoreError>;

    async fn get(&self, key: &str) -> Result<Option<Thumbnail>, ThumbnailStoreError>;
}

/// Keys are flat file names: no separators, no parent references.
fn ensure_key_safe(key: &str) -> Result<(), ThumbnailStoreError> {
    if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
        return Err(ThumbnailStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Stores thumbnails as files under `root`; the media type is recovered
/// from the key's extension.
pub struct DiskThumbnailStore {
    root: PathBuf,
}

impl DiskThumbnailStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn media_type_for_key(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpeg") | Some("jpg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ThumbnailStore for DiskThumbnailStore {
    async fn put(&self, key: &str, thumbnail: Thumbnail) -> Result<(), ThumbnailStoreError> {
        ensure_key_safe(key)?;
        fs::create_dir_all(&self.root).await?;
        fs::write(self.root.join(key), &thumbnail.data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Thumbnail>, ThumbnailStoreError> {
        ensure_key_safe(key)?;
        match fs::read(self.root.join(key)).await {
            Ok(data) => Ok(Some(Thumbnail {
                media_type: media_type_for_key(key).to_string(),
                data: Bytes::from(data),
            })),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryThumbnailStore {
    thumbnails: RwLock<HashMap<String, Thumbnail>>,
}

impl MemoryThumbnailStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThumbnailStore for MemoryThumbnailStore {
    async fn put(&self, key: &str, thumbnail: Thumbnail) -> Result<(), ThumbnailStoreError> {
        ensure_key_safe(key)?;
        self.thumbnails
            .write()
            .await
            .insert(key.to_string(), thumbnail);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Thumbnail>, ThumbnailStoreError> {
        Ok(self.thumbnails.read().await.get(key).cloned())
    }
}
