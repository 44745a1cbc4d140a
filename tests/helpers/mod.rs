//! In-process stand-ins for the pipeline's external collaborators.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tempfile::TempDir;
use tubely_ingest::{
    models::{aspect_ratio::AspectRatio, location::LocationMode, video::Video},
    routes::routes,
    services::{
        identity::{Claims, JwtVerifier, TOKEN_ISSUER},
        ingest_service::{IngestService, IngestSettings},
        media::{FastStartRewriter, GeometryClassifier, MediaError, MediaResult},
        object_store::{ObjectStore, ObjectStoreError, ObjectStoreResult},
        thumbnail_store::MemoryThumbnailStore,
        video_store::{MemoryVideoStore, StoreError, StoreResult, VideoStore},
    },
    state::AppState,
};
use uuid::Uuid;

pub const BUCKET: &str = "tubely-private";
pub const JWT_SECRET: &str = "test-secret";
pub const PROCESSED_MARKER: &[u8] = b"[faststart]";

/// Classifies every file as having the configured dimensions.
pub struct FixedClassifier {
    pub dimensions: Option<(u32, u32)>,
    pub calls: AtomicUsize,
}

impl FixedClassifier {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dimensions: Some((width, height)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn without_video_stream() -> Self {
        Self {
            dimensions: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GeometryClassifier for FixedClassifier {
    async fn classify(&self, path: &Path) -> MediaResult<AspectRatio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(path.exists(), "classifier must see the buffered upload");
        let (width, height) = self.dimensions.ok_or(MediaError::NoVideoStream)?;
        Ok(AspectRatio::from_dimensions(width, height))
    }
}

/// Writes `<input>.processing` holding a marker followed by the input.
#[derive(Default)]
pub struct MarkingRewriter {
    pub outputs: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl FastStartRewriter for MarkingRewriter {
    async fn rewrite(&self, input: &Path) -> MediaResult<PathBuf> {
        let mut output = input.as_os_str().to_owned();
        output.push(".processing");
        let output = PathBuf::from(output);

        let mut data = PROCESSED_MARKER.to_vec();
        data.extend(tokio::fs::read(input).await.unwrap());
        tokio::fs::write(&output, data).await.unwrap();

        self.outputs.lock().unwrap().push(output.clone());
        Ok(output)
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Keeps uploaded objects in memory and presigns fake URLs.
#[derive(Default)]
pub struct RecordingObjectStore {
    pub objects: Mutex<HashMap<String, StoredObject>>,
    pub fail_uploads: AtomicBool,
}

impl RecordingObjectStore {
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for RecordingObjectStore {
    fn bucket(&self) -> &str {
        BUCKET
    }

    async fn put_object(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> ObjectStoreResult<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Upload {
                key: key.to_string(),
                message: "503 Slow Down".to_string(),
            });
        }
        let data = tokio::fs::read(source).await?;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                data,
            },
        );
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String> {
        Ok(format!(
            "https://{bucket}.s3.test/{key}?X-Amz-Expires={}",
            expires_in.as_secs()
        ))
    }
}

/// Memory store that counts writes and can be told to fail them.
#[derive(Default)]
pub struct CountingVideoStore {
    pub inner: MemoryVideoStore,
    pub updates: AtomicUsize,
    pub fail_updates: AtomicBool,
}

impl CountingVideoStore {
    /// Read straight from the backing store, bypassing the counters.
    pub async fn inner_get(&self, id: Uuid) -> Video {
        self.inner.get_video(id).await.unwrap()
    }
}

#[async_trait]
impl VideoStore for CountingVideoStore {
    async fn get_video(&self, id: Uuid) -> StoreResult<Video> {
        self.inner.get_video(id).await
    }

    async fn update_video(&self, video: &Video) -> StoreResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        self.inner.update_video(video).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

pub fn video_owned_by(owner: Uuid) -> Video {
    let now = Utc::now();
    Video {
        id: Uuid::new_v4(),
        user_id: owner,
        created_at: now,
        updated_at: now,
        title: "boots".into(),
        description: "walking in the rain".into(),
        thumbnail_url: Some("http://localhost:8091/assets/existing.png".into()),
        video_url: None,
    }
}

pub fn token_for(user: Uuid) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.to_string(),
        iss: TOKEN_ISSUER.to_string(),
        iat: now,
        exp: now + 3600,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// A fully wired service with fakes, plus handles to inspect them.
pub struct Harness {
    pub service: IngestService,
    pub videos: Arc<CountingVideoStore>,
    pub classifier: Arc<FixedClassifier>,
    pub rewriter: Arc<MarkingRewriter>,
    pub objects: Arc<RecordingObjectStore>,
    pub thumbnails: Arc<MemoryThumbnailStore>,
    pub scratch: TempDir,
}

impl Harness {
    pub fn new(classifier: FixedClassifier) -> Self {
        Self::with_mode(classifier, LocationMode::Signed)
    }

    pub fn with_mode(classifier: FixedClassifier, location_mode: LocationMode) -> Self {
        let videos = Arc::new(CountingVideoStore::default());
        let classifier = Arc::new(classifier);
        let rewriter = Arc::new(MarkingRewriter::default());
        let objects = Arc::new(RecordingObjectStore::default());
        let thumbnails = Arc::new(MemoryThumbnailStore::new());
        let scratch = tempfile::tempdir().unwrap();

        let service = IngestService::new(
            videos.clone(),
            classifier.clone(),
            rewriter.clone(),
            objects.clone(),
            thumbnails.clone(),
            IngestSettings {
                scratch_dir: scratch.path().to_path_buf(),
                max_video_bytes: 1024,
                max_thumbnail_bytes: 256,
                location_mode,
                cdn_distribution: "https://d111111abcdef8.cloudfront.net".into(),
                public_base_url: "http://localhost:8091".into(),
                presign_expiry: Duration::from_secs(15 * 60),
            },
        );

        Self {
            service,
            videos,
            classifier,
            rewriter,
            objects,
            thumbnails,
            scratch,
        }
    }

    pub async fn seed(&self, video: Video) -> Video {
        self.videos.inner.insert(video.clone()).await;
        video
    }

    /// Number of entries left in the scratch directory.
    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            ingest: self.service.clone(),
            identity: Arc::new(JwtVerifier::new(JWT_SECRET)),
            videos: self.videos.clone(),
            thumbnails: self.thumbnails.clone(),
            local_objects: None,
            scratch_dir: self.scratch.path().to_path_buf(),
        };
        routes(1024, 256).with_state(state)
    }
}
