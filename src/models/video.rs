//! Represents a video record owned by the metadata store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A video record as stored in the metadata store.
///
/// The ingest pipeline never creates or deletes these; it reads one,
/// checks ownership and writes back a full replacement.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Video {
    /// Opaque unique identifier, also the path parameter of the upload routes.
    pub id: Uuid,

    /// Identity of the user that owns this record.
    pub user_id: Uuid,

    /// When this record was created.
    pub created_at: DateTime<Utc>,

    /// When this record was last replaced.
    pub updated_at: DateTime<Utc>,

    pub title: String,

    pub description: String,

    /// URL of the thumbnail image, if one was uploaded.
    pub thumbnail_url: Option<String>,

    /// Persisted location reference of the processed video.
    ///
    /// Either a `bucket,key` pair or a fully resolved URL, see
    /// [`crate::models::location::VideoLocation`].
    pub video_url: Option<String>,
}

impl Video {
    /// Build the replacement record after a successful video upload.
    ///
    /// Identity, owner, creation time and thumbnail are carried over.
    pub fn with_video_url(&self, video_url: String, now: DateTime<Utc>) -> Self {
        Self {
            updated_at: now,
            video_url: Some(video_url),
            ..self.clone()
        }
    }

    /// Build the replacement record after a successful thumbnail upload.
    pub fn with_thumbnail_url(&self, thumbnail_url: String, now: DateTime<Utc>) -> Self {
        Self {
            updated_at: now,
            thumbnail_url: Some(thumbnail_url),
            ..self.clone()
        }
    }
}
