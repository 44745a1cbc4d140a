//! Geometry classification via `ffprobe`.

use super::{GeometryClassifier, MediaError, MediaResult, tool_name};
use crate::models::aspect_ratio::AspectRatio;
use async_trait::async_trait;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::process::Command;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Runs `ffprobe` and classifies the first video stream it reports.
#[derive(Debug, Clone)]
pub struct FfprobeClassifier {
    program: PathBuf,
}

impl FfprobeClassifier {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl GeometryClassifier for FfprobeClassifier {
    #[instrument(skip(self), fields(tool = %self.program.display()))]
    async fn classify(&self, path: &Path) -> MediaResult<AspectRatio> {
        let tool = tool_name(&self.program);
        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-select_streams",
                "v:0",
            ])
            .arg(path)
            .stdin(Stdio::null())
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

        let (width, height) = first_video_dimensions(&output.stdout)?;
        let aspect_ratio = AspectRatio::from_dimensions(width, height);
        debug!(width, height, %aspect_ratio, "probed video geometry");
        Ok(aspect_ratio)
    }
}

/// Pull `(width, height)` of the first video stream out of `ffprobe` JSON.
fn first_video_dimensions(stdout: &[u8]) -> MediaResult<(u32, u32)> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;
    probe
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref().is_none_or(|t| t == "video"))
        .find_map(|s| Some((s.width?, s.height?)))
        .ok_or(MediaError::NoVideoStream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_stream_dimensions() {
        let json = br#"{"streams": [{"width": 1920, "height": 1080}, {"width": 640, "height": 480}]}"#;
        assert_eq!(first_video_dimensions(json).unwrap(), (1920, 1080));
    }

    #[test]
    fn skips_non_video_streams() {
        let json = br#"{"streams": [
            {"codec_type": "audio"},
            {"codec_type": "video", "width": 1080, "height": 1920}
        ]}"#;
        assert_eq!(first_video_dimensions(json).unwrap(), (1080, 1920));
    }

    #[test]
    fn zero_streams_is_an_error() {
        let err = first_video_dimensions(br#"{"streams": []}"#).unwrap_err();
        assert!(matches!(err, MediaError::NoVideoStream));

        let err = first_video_dimensions(b"{}").unwrap_err();
        assert!(matches!(err, MediaError::NoVideoStream));
    }

    #[test]
    fn garbage_output_is_an_error() {
        let err = first_video_dimensions(b"not json").unwrap_err();
        assert!(matches!(err, MediaError::InvalidProbeOutput(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn classifies_through_the_external_tool() {
        use crate::services::media::test_support::fake_tool;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"not really a video").unwrap();

        let portrait = fake_tool(
            dir.path(),
            "probe-portrait",
            r#"echo '{"streams": [{"width": 1080, "height": 1920}]}'"#,
        );
        let ratio = FfprobeClassifier::new(portrait).classify(&input).await.unwrap();
        assert_eq!(ratio, AspectRatio::Portrait);

        let broken = fake_tool(dir.path(), "probe-broken", "echo 'moov atom not found' >&2\nexit 1");
        let err = FfprobeClassifier::new(broken).classify(&input).await.unwrap_err();
        match err {
            MediaError::ToolFailed { tool, stderr, .. } => {
                assert_eq!(tool, "probe-broken");
                assert_eq!(stderr, "moov atom not found");
            }
            other => panic!("unexpected error: {other}"),
        }

        let missing = FfprobeClassifier::new(dir.path().join("does-not-exist"));
        assert!(matches!(
            missing.classify(&input).await.unwrap_err(),
            MediaError::Spawn { .. }
        ));
    }
}
