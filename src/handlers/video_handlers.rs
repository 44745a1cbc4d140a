use super::parse_video_id;
use crate::{errors::AppError, models::video::Video, state::AppState};
use axum::{
    Json,
    extract::{Path, State},
};

/// `GET /api/videos/{videoID}` — the record, with private video locations
/// replaced by presigned URLs.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<Video>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let video = state.ingest.signed_video(video_id).await?;
    Ok(Json(video))
}
