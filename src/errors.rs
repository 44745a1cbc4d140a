use crate::services::{
    identity::AuthError,
    ingest_service::UploadError,
    media::MediaError,
    object_store::ObjectStoreError,
};
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = match err {
            AuthError::MissingCredential | AuthError::MalformedHeader => "Couldn't find JWT",
            AuthError::InvalidToken(_) | AuthError::InvalidSubject => "Couldn't validate JWT",
        };
        tracing::debug!(error = %err, "rejected credential");
        AppError::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::new(err.status(), err.body_text())
    }
}

/// Client mistakes carry their own message; dependency failures are logged
/// in full and reported generically.
impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match &err {
            UploadError::InvalidMediaType(_) => AppError::bad_request("Invalid Content-Type"),
            UploadError::UnsupportedMediaType(media_type) => {
                AppError::bad_request(format!("Unsupported file type `{media_type}`"))
            }
            UploadError::PayloadTooLarge { limit } => AppError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Upload exceeds the {limit} byte limit"),
            ),
            UploadError::Body(_) => AppError::bad_request("Could not read upload body"),
            UploadError::VideoNotFound(_) => AppError::not_found("Couldn't find video"),
            UploadError::NotOwner => AppError::forbidden("Not authorized to update this video"),
            UploadError::Media(MediaError::NoVideoStream) => {
                AppError::bad_request("Upload contains no video stream")
            }
            UploadError::ObjectStore(
                ObjectStoreError::InvalidBucketName { .. } | ObjectStoreError::InvalidObjectKey(_),
            ) => {
                tracing::error!(error = %err, "stored video location is malformed");
                AppError::internal("Stored video location is malformed")
            }
            UploadError::Scratch(_)
            | UploadError::Media(_)
            | UploadError::ObjectStore(_)
            | UploadError::Thumbnails(_)
            | UploadError::Store(_) => {
                tracing::error!(error = %err, "upload pipeline failed");
                AppError::internal(internal_message(&err))
            }
        }
    }
}

fn internal_message(err: &UploadError) -> &'static str {
    match err {
        UploadError::Scratch(_) => "Could not write file to disk",
        UploadError::Media(_) => "Error processing video",
        UploadError::ObjectStore(_) => "Error uploading file to object storage",
        UploadError::Thumbnails(_) => "Could not store thumbnail",
        _ => "Couldn't update video",
    }
}
