//! HTTP handlers. Each one parses the request, delegates to the service
//! layer and maps errors through [`crate::errors::AppError`].

pub mod asset_handlers;
pub mod health_handlers;
pub mod upload_handlers;
pub mod video_handlers;

use crate::errors::AppError;
use uuid::Uuid;

pub(crate) fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request("Invalid ID"))
}
