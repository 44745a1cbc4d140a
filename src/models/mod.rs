//! Core data models for the ingest service.
//!
//! `Video` maps to the metadata table via `sqlx::FromRow` and serializes as
//! JSON via `serde`. The remaining types are derived values that only ever
//! live for one request.

pub mod aspect_ratio;
pub mod location;
pub mod media_type;
pub mod video;
