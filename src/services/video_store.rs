//! Metadata store for video records.
//!
//! The ingest pipeline only reads and replaces records. Writes are full-row
//! replacements with last-writer-wins semantics; no locking is done here.

use crate::models::video::Video;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

const MIGRATION_SQL: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn get_video(&self, id: Uuid) -> StoreResult<Video>;

    /// Replace the stored record with `video`.
    async fn update_video(&self, video: &Video) -> StoreResult<()>;

    /// Cheap connectivity probe for readiness checks.
    async fn health_check(&self) -> StoreResult<()>;
}

/// SQLite-backed [`VideoStore`].
#[derive(Clone)]
pub struct SqliteVideoStore {
    pub db: Arc<SqlitePool>,
}

impl SqliteVideoStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Apply the embedded schema, one statement at a time.
    pub async fn run_migrations(&self) -> StoreResult<usize> {
        let statements = MIGRATION_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        for stmt in &statements {
            tracing::debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(statements.len())
    }

    /// Insert a new record. Creating videos is not part of ingest; this is
    /// for seeding and tests.
    pub async fn insert_video(&self, video: &Video) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO videos (id, user_id, created_at, updated_at, title, description,
                                 thumbnail_url, video_url)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(video.id)
        .bind(video.user_id)
        .bind(video.created_at)
        .bind(video.updated_at)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .execute(&*self.db)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl VideoStore for SqliteVideoStore {
    async fn get_video(&self, id: Uuid) -> StoreResult<Video> {
        sqlx::query_as::<_, Video>(
            "SELECT id, user_id, created_at, updated_at, title, description,
                    thumbnail_url, video_url
             FROM videos WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::NotFound(id),
            other => StoreError::Sqlx(other),
        })
    }

    async fn update_video(&self, video: &Video) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE videos
             SET user_id = ?, created_at = ?, updated_at = ?, title = ?, description = ?,
                 thumbnail_url = ?, video_url = ?
             WHERE id = ?",
        )
        .bind(video.user_id)
        .bind(video.created_at)
        .bind(video.updated_at)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(video.id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(video.id));
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }
}

/// In-memory [`VideoStore`] for development and tests.
#[derive(Default)]
pub struct MemoryVideoStore {
    videos: RwLock<HashMap<Uuid, Video>>,
}

impl MemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, video: Video) {
        self.videos.write().await.insert(video.id, video);
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn get_video(&self, id: Uuid) -> StoreResult<Video> {
        self.videos
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn update_video(&self, video: &Video) -> StoreResult<()> {
        let mut videos = self.videos.write().await;
        match videos.get_mut(&video.id) {
            Some(existing) => {
                *existing = video.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(video.id)),
        }
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
