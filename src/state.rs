//! Shared handler state.

use crate::services::{
    identity::IdentityVerifier, ingest_service::IngestService, object_store::LocalObjectStore,
    thumbnail_store::ThumbnailStore, video_store::VideoStore,
};
use std::{path::PathBuf, sync::Arc};

/// Everything the handlers need, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub ingest: IngestService,
    pub identity: Arc<dyn IdentityVerifier>,
    pub videos: Arc<dyn VideoStore>,
    pub thumbnails: Arc<dyn ThumbnailStore>,
    /// Set when objects live on local disk and this service serves them.
    pub local_objects: Option<Arc<LocalObjectStore>>,
    pub scratch_dir: PathBuf,
}
