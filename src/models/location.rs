//! Persisted location references for processed videos.

use std::fmt;

/// Separator between bucket and key in a persisted `bucket,key` pair.
const PAIR_SEPARATOR: char = ',';

/// How a freshly uploaded video is referenced from its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LocationMode {
    /// Store `bucket,key`; readers mint a presigned URL on each read.
    Signed,
    /// Store `<distribution>/<key>`; the CDN serves the object directly.
    Cdn,
}

/// A decoded video location reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoLocation {
    /// A private object that must be presigned before use.
    Object { bucket: String, key: String },
    /// A URL that can be handed out as-is.
    Url(String),
}

impl VideoLocation {
    /// Build the reference to persist for a new upload.
    pub fn for_upload(mode: LocationMode, bucket: &str, key: &str, distribution: &str) -> Self {
        match mode {
            LocationMode::Signed => Self::Object {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            LocationMode::Cdn => Self::Url(format!(
                "{}/{}",
                distribution.trim_end_matches('/'),
                key
            )),
        }
    }

    /// Decode a persisted reference.
    ///
    /// Anything that does not split into two non-empty parts around the
    /// first comma is treated as a plain URL.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(PAIR_SEPARATOR) {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Self::Object {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            _ => Self::Url(raw.to_string()),
        }
    }
}

impl fmt::Display for VideoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object { bucket, key } => write!(f, "{bucket}{PAIR_SEPARATOR}{key}"),
            Self::Url(url) => f.write_str(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_mode_persists_bucket_key_pair() {
        let loc = VideoLocation::for_upload(
            LocationMode::Signed,
            "tubely-private",
            "portrait/abc.mp4",
            "https://d1.cloudfront.net",
        );
        assert_eq!(loc.to_string(), "tubely-private,portrait/abc.mp4");
        assert_eq!(VideoLocation::parse(&loc.to_string()), loc);
    }

    #[test]
    fn cdn_mode_persists_distribution_url() {
        let loc = VideoLocation::for_upload(
            LocationMode::Cdn,
            "tubely-private",
            "landscape/abc.mp4",
            "https://d1.cloudfront.net/",
        );
        assert_eq!(loc.to_string(), "https://d1.cloudfront.net/landscape/abc.mp4");
        assert!(matches!(VideoLocation::parse(&loc.to_string()), VideoLocation::Url(_)));
    }

    #[test]
    fn malformed_pairs_are_urls() {
        assert_eq!(
            VideoLocation::parse(",key"),
            VideoLocation::Url(",key".to_string())
        );
        assert_eq!(
            VideoLocation::parse("bucket,"),
            VideoLocation::Url("bucket,".to_string())
        );
    }
}
