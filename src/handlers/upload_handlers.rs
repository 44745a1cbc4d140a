//! Multipart upload endpoints.
//!
//! The file part is never collected up front: its chunk stream is handed to
//! the ingest service, which enforces the size limit while reading.

use super::parse_video_id;
use crate::{
    errors::AppError,
    models::video::Video,
    services::{identity::bearer_token, ingest_service::UploadSession},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::HeaderMap,
};
use futures::StreamExt;
use std::io;
use tracing::info;
use uuid::Uuid;

const VIDEO_FIELD: &str = "video";
const THUMBNAIL_FIELD: &str = "thumbnail";

/// `POST /api/video_upload/{videoID}`
pub async fn upload_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    let (video_id, owner) = caller(&state, &video_id, &headers)?;
    info!(%video_id, %owner, "uploading video");

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }
        let session = UploadSession {
            video_id,
            owner,
            media_type: field.content_type().unwrap_or_default().to_string(),
            body: field.map(|chunk| chunk.map_err(io::Error::other)),
        };
        let video = state.ingest.upload_video(session).await?;
        return Ok(Json(video));
    }

    Err(AppError::bad_request("Unable to parse form file"))
}

/// `POST /api/thumbnail_upload/{videoID}`
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    let (video_id, owner) = caller(&state, &video_id, &headers)?;
    info!(%video_id, %owner, "uploading thumbnail");

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(THUMBNAIL_FIELD) {
            continue;
        }
        let session = UploadSession {
            video_id,
            owner,
            media_type: field.content_type().unwrap_or_default().to_string(),
            body: field.map(|chunk| chunk.map_err(io::Error::other)),
        };
        let video = state.ingest.upload_thumbnail(session).await?;
        return Ok(Json(video));
    }

    Err(AppError::bad_request("Unable to parse form file"))
}

/// Target video id and authenticated caller.
fn caller(state: &AppState, raw_id: &str, headers: &HeaderMap) -> Result<(Uuid, Uuid), AppError> {
    let video_id = parse_video_id(raw_id)?;
    let owner = state.identity.verify(bearer_token(headers)?)?;
    Ok((video_id, owner))
}
