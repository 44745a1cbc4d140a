//! Route table for the ingest service.
//!
//! ## Structure
//! - **Uploads** (bearer credential required)
//!   - `POST /api/video_upload/{videoID}` — multipart field `video`
//!   - `POST /api/thumbnail_upload/{videoID}` — multipart field `thumbnail`
//! - **Reads**
//!   - `GET /api/videos/{videoID}` — record with a presigned video URL
//!   - `GET /assets/{key}` — stored thumbnails
//!   - `GET /objects/{bucket}/{*key}` — presigned local objects
//! - **Probes**: `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        asset_handlers::{get_object, get_thumbnail},
        health_handlers::{healthz, readyz},
        upload_handlers::{upload_thumbnail, upload_video},
        video_handlers::get_video,
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Build the router.
///
/// The body limits sit slightly above the file limits so the upload service
/// reports an oversized file itself; the transport limit stops anything
/// beyond that from being read at all.
pub fn routes(max_video_bytes: u64, max_thumbnail_bytes: u64) -> Router<AppState> {
    let body_limit = |file_limit: u64| {
        DefaultBodyLimit::max(
            usize::try_from(file_limit.saturating_add(MULTIPART_OVERHEAD)).unwrap_or(usize::MAX),
        )
    };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/api/video_upload/{video_id}",
            post(upload_video).layer(body_limit(max_video_bytes)),
        )
        .route(
            "/api/thumbnail_upload/{video_id}",
            post(upload_thumbnail).layer(body_limit(max_thumbnail_bytes)),
        )
        .route("/api/videos/{video_id}", get(get_video))
        .route("/assets/{key}", get(get_thumbnail))
        .route("/objects/{bucket}/{*key}", get(get_object))
        .layer(TraceLayer::new_for_http())
}
