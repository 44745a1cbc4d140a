//! Fast-start remux via `ffmpeg`.
//!
//! Moves the `moov` atom ahead of the media data with a stream copy, so the
//! processed file plays before it has fully downloaded.

use super::{FastStartRewriter, MediaError, MediaResult, tool_name};
use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::{fs, process::Command};
use tracing::{debug, instrument};

const PROCESSED_SUFFIX: &str = ".processing";

#[derive(Debug, Clone)]
pub struct FfmpegFastStart {
    program: PathBuf,
}

impl FfmpegFastStart {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// `<input>.processing`, next to the input.
pub fn processed_path(input: &Path) -> PathBuf {
    let mut path = input.as_os_str().to_owned();
    path.push(PROCESSED_SUFFIX);
    PathBuf::from(path)
}

#[async_trait]
impl FastStartRewriter for FfmpegFastStart {
    #[instrument(skip(self), fields(tool = %self.program.display()))]
    async fn rewrite(&self, input: &Path) -> MediaResult<PathBuf> {
        let tool = tool_name(&self.program);
        let output_path = processed_path(input);

        let output = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-movflags", "faststart", "-codec", "copy", "-f", "mp4"])
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| MediaError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(MediaError::ToolFailed {
                tool,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let meta = fs::metadata(&output_path)
            .await
            .map_err(|source| MediaError::MissingOutput {
                path: output_path.clone(),
                source,
            })?;
        if meta.len() == 0 {
            return Err(MediaError::EmptyOutput(output_path));
        }

        debug!(bytes = meta.len(), output = %output_path.display(), "fast-start remux complete");
        Ok(output_path)
    }
}
