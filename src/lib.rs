//! Video ingest pipeline.
//!
//! Accepts an uploaded MP4 over HTTP, classifies its geometry, rewrites it
//! for fast start, stores it in object storage and records where it went on
//! the owning video record.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
