//! Local media inspection and container rewriting.
//!
//! Both capabilities sit behind narrow traits so the orchestrator does not
//! care whether they are backed by `ffprobe`/`ffmpeg` subprocesses or by an
//! in-process library.

use crate::models::aspect_ratio::AspectRatio;
use async_trait::async_trait;
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub mod faststart;
pub mod probe;

pub use faststart::FfmpegFastStart;
pub use probe::FfprobeClassifier;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to spawn `{tool}`: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },
    #[error("`{tool}` exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("unreadable probe output: {0}")]
    InvalidProbeOutput(#[from] serde_json::Error),
    #[error("no video stream found")]
    NoVideoStream,
    #[error("could not stat processed file {path}: {source}")]
    MissingOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("processed file {0} is empty")]
    EmptyOutput(PathBuf),
}

pub type MediaResult<T> = Result<T, MediaError>;

/// Classifies the geometry of a local, seekable video file.
#[async_trait]
pub trait GeometryClassifier: Send + Sync {
    async fn classify(&self, path: &Path) -> MediaResult<AspectRatio>;
}

/// Produces a progressive-playback copy of a local video file.
///
/// Implementations write a new sibling file and never touch the input.
/// On failure, removing any partial output is the caller's job.
#[async_trait]
pub trait FastStartRewriter: Send + Sync {
    async fn rewrite(&self, input: &Path) -> MediaResult<PathBuf>;
}

/// Human readable program name for error messages.
pub(crate) fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string())
}
