//! Service layer: the upload orchestrator and the collaborators it drives.

pub mod identity;
pub mod ingest_service;
pub mod media;
pub mod object_store;
pub mod thumbnail_store;
pub mod video_store;
