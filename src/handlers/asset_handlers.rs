//! Read-side endpoints for stored bytes: thumbnails and presigned local
//! objects. Object bodies are streamed, never buffered.

use crate::{errors::AppError, services::object_store::ObjectStoreError, state::AppState};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

/// Signature parameters carried by a presigned local object URL.
#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

/// `GET /assets/{key}`
pub async fn get_thumbnail(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let thumbnail = state
        .thumbnails
        .get(&key)
        .await
        .map_err(|err| {
            tracing::debug!(error = %err, %key, "thumbnail lookup failed");
            AppError::not_found("Thumbnail not found")
        })?
        .ok_or_else(|| AppError::not_found("Thumbnail not found"))?;

    let mut response = Response::new(Body::from(thumbnail.data));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&thumbnail.media_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}

/// `GET /objects/{bucket}/{*key}?expires=..&signature=..`
pub async fn get_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(signed): Query<SignedQuery>,
) -> Result<Response, AppError> {
    let store = state
        .local_objects
        .as_ref()
        .ok_or_else(|| AppError::not_found("Not found"))?;

    store
        .verify(&bucket, &key, signed.expires, &signed.signature)
        .map_err(|err| AppError::forbidden(err.to_string()))?;

    let (file, len) = store.open_object(&bucket, &key).await.map_err(|err| match err {
        ObjectStoreError::ObjectNotFound { .. } => AppError::not_found(err.to_string()),
        ObjectStoreError::InvalidBucketName { .. } | ObjectStoreError::InvalidObjectKey(_) => {
            AppError::bad_request(err.to_string())
        }
        other => AppError::internal(other.to_string()),
    })?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for_key(&key)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    Ok(response)
}

fn content_type_for_key(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext) {
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}
