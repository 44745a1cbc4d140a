//! IngestService: the upload orchestrator.
//!
//! A video upload runs strictly in order, stopping at the first failure:
//! validate → authorize → buffer → classify → rewrite → upload → persist.
//! Temporary artifacts live in a per-request scratch directory that is
//! removed on every exit path. Nothing already done is rolled back: an
//! object uploaded before a failed metadata write stays where it is.

use crate::{
    models::{
        location::{LocationMode, VideoLocation},
        media_type::{MediaType, MediaTypeError, extension_for},
        video::Video,
    },
    services::{
        media::{FastStartRewriter, GeometryClassifier, MediaError},
        object_store::{ObjectStore, ObjectStoreError, asset_key},
        thumbnail_store::{Thumbnail, ThumbnailStore, ThumbnailStoreError},
        video_store::{StoreError, VideoStore},
    },
};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

pub const VIDEO_MEDIA_TYPES: &[&str] = &["video/mp4"];
pub const THUMBNAIL_MEDIA_TYPES: &[&str] = &["image/jpeg", "image/png"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    InvalidMediaType(#[from] MediaTypeError),
    #[error("unsupported media type `{0}`")]
    UnsupportedMediaType(String),
    #[error("upload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },
    #[error("could not read upload body: {0}")]
    Body(#[source] io::Error),
    #[error("video `{0}` not found")]
    VideoNotFound(Uuid),
    #[error("video does not belong to the caller")]
    NotOwner,
    #[error("scratch storage failed: {0}")]
    Scratch(#[source] io::Error),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),
    #[error(transparent)]
    Thumbnails(#[from] ThumbnailStoreError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for UploadError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => UploadError::VideoNotFound(id),
            other => UploadError::Store(other),
        }
    }
}

pub type UploadResult<T> = Result<T, UploadError>;

/// One request's upload: the body stream, its declared media type, and who
/// is sending it. Never persisted.
pub struct UploadSession<S> {
    pub video_id: Uuid,
    pub owner: Uuid,
    pub media_type: String,
    pub body: S,
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Parent directory for per-request scratch directories.
    pub scratch_dir: PathBuf,
    pub max_video_bytes: u64,
    pub max_thumbnail_bytes: u64,
    pub location_mode: LocationMode,
    /// CDN host used in `cdn` location mode.
    pub cdn_distribution: String,
    /// Base URL thumbnail links are built on.
    pub public_base_url: String,
    pub presign_expiry: Duration,
}

#[derive(Clone)]
pub struct IngestService {
    videos: Arc<dyn VideoStore>,
    classifier: Arc<dyn GeometryClassifier>,
    rewriter: Arc<dyn FastStartRewriter>,
    objects: Arc<dyn ObjectStore>,
    thumbnails: Arc<dyn ThumbnailStore>,
    settings: IngestSettings,
}

impl IngestService {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        classifier: Arc<dyn GeometryClassifier>,
        rewriter: Arc<dyn FastStartRewriter>,
        objects: Arc<dyn ObjectStore>,
        thumbnails: Arc<dyn ThumbnailStore>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            videos,
            classifier,
            rewriter,
            objects,
            thumbnails,
            settings,
        }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Run the full video pipeline and return the updated record.
    #[instrument(skip(self, session), fields(video_id = %session.video_id, owner = %session.owner))]
    pub async fn upload_video<S>(&self, session: UploadSession<S>) -> UploadResult<Video>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let media_type = accept_media_type(&session.media_type, VIDEO_MEDIA_TYPES)?;
        let video = self.authorize(session.video_id, session.owner).await?;

        let scratch = tempfile::Builder::new()
            .prefix("tubely-upload")
            .tempdir_in(&self.settings.scratch_dir)
            .map_err(UploadError::Scratch)?;
        let raw_path = scratch
            .path()
            .join(format!("upload{}", extension_for(media_type.essence())));

        let size = buffer_to_file(session.body, &raw_path, self.settings.max_video_bytes).await?;
        debug!(bytes = size, path = %raw_path.display(), "upload buffered");

        let aspect_ratio = self.classifier.classify(&raw_path).await?;
        let processed = self.rewriter.rewrite(&raw_path).await?;

        let key = asset_key(aspect_ratio.key_prefix(), media_type.essence());
        let bucket = self.objects.bucket().to_string();
        self.objects
            .put_object(&key, &processed, media_type.essence())
            .await?;
        info!(%bucket, %key, %aspect_ratio, "video uploaded");

        let location = VideoLocation::for_upload(
            self.settings.location_mode,
            &bucket,
            &key,
            &self.settings.cdn_distribution,
        );
        let updated = video.with_video_url(location.to_string(), Utc::now());
        if let Err(err) = self.videos.update_video(&updated).await {
            error!(%bucket, %key, error = %err, "metadata write failed; uploaded object is orphaned");
            return Err(err.into());
        }

        if let Err(err) = scratch.close() {
            debug!(error = %err, "could not remove scratch directory");
        }
        Ok(updated)
    }

    /// Store a thumbnail and point the record at it.
    #[instrument(skip(self, session), fields(video_id = %session.video_id, owner = %session.owner))]
    pub async fn upload_thumbnail<S>(&self, session: UploadSession<S>) -> UploadResult<Video>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let media_type = accept_media_type(&session.media_type, THUMBNAIL_MEDIA_TYPES)?;
        let video = self.authorize(session.video_id, session.owner).await?;

        let data = buffer_to_memory(session.body, self.settings.max_thumbnail_bytes).await?;
        let key = asset_key("", media_type.essence());
        self.thumbnails
            .put(
                &key,
                Thumbnail {
                    media_type: media_type.essence().to_string(),
                    data,
                },
            )
            .await?;

        let url = format!(
            "{}/assets/{key}",
            self.settings.public_base_url.trim_end_matches('/')
        );
        let updated = video.with_thumbnail_url(url, Utc::now());
        self.videos.update_video(&updated).await?;
        info!(%key, "thumbnail stored");
        Ok(updated)
    }

    /// Fetch a record for reading, swapping a `bucket,key` reference for a
    /// freshly presigned URL.
    #[instrument(skip(self))]
    pub async fn signed_video(&self, video_id: Uuid) -> UploadResult<Video> {
        let mut video = self.videos.get_video(video_id).await?;
        if let Some(VideoLocation::Object { bucket, key }) =
            video.video_url.as_deref().map(VideoLocation::parse)
        {
            let url = self
                .objects
                .presign_get(&bucket, &key, self.settings.presign_expiry)
                .await?;
            video.video_url = Some(url);
        }
        Ok(video)
    }

    /// Load the record and check the caller owns it.
    async fn authorize(&self, video_id: Uuid, owner: Uuid) -> UploadResult<Video> {
        let video = self.videos.get_video(video_id).await?;
        if video.user_id != owner {
            return Err(UploadError::NotOwner);
        }
        Ok(video)
    }
}

fn accept_media_type(raw: &str, allowed: &[&str]) -> UploadResult<MediaType> {
    let media_type = MediaType::parse(raw)?;
    if !media_type.is_one_of(allowed) {
        return Err(UploadError::UnsupportedMediaType(media_type.to_string()));
    }
    Ok(media_type)
}

/// Copy the body to `path`, refusing to read past `limit` bytes.
async fn buffer_to_file<S>(body: S, path: &Path, limit: u64) -> UploadResult<u64>
where
    S: Stream<Item = io::Result<Bytes>> + Send,
{
    let mut file = File::create(path).await.map_err(UploadError::Scratch)?;
    let mut size_bytes: u64 = 0;

    pin_mut!(body);
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(UploadError::Body)?;
        size_bytes += chunk.len() as u64;
        if size_bytes > limit {
            return Err(UploadError::PayloadTooLarge { limit });
        }
        file.write_all(&chunk).await.map_err(UploadError::Scratch)?;
    }
    file.flush().await.map_err(UploadError::Scratch)?;
    file.sync_all().await.map_err(UploadError::Scratch)?;
    Ok(size_bytes)
}

async fn buffer_to_memory<S>(body: S, limit: u64) -> UploadResult<Bytes>
where
    S: Stream<Item = io::Result<Bytes>> + Send,
{
    let mut buf = BytesMut::new();
    pin_mut!(body);
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(UploadError::Body)?;
        if (buf.len() + chunk.len()) as u64 > limit {
            return Err(UploadError::PayloadTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}
