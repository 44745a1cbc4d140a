//! Coarse geometry buckets used to namespace stored videos.

use serde::Serialize;
use std::fmt;

/// Allowed distance between a measured ratio and its target.
const RATIO_TOLERANCE: f64 = 0.1;

/// Aspect ratio category of a video's first video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "other")]
    Other,
}

impl AspectRatio {
    /// Classify pixel dimensions.
    ///
    /// A ratio within 0.1 of 16/9 is landscape, within 0.1 of 9/16 is
    /// portrait, anything else (including a zero height) is `Other`.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height == 0 {
            return Self::Other;
        }
        let ratio = f64::from(width) / f64::from(height);
        if (ratio - 16.0 / 9.0).abs() < RATIO_TOLERANCE {
            Self::Landscape
        } else if (ratio - 9.0 / 16.0).abs() < RATIO_TOLERANCE {
            Self::Portrait
        } else {
            Self::Other
        }
    }

    /// Human label, e.g. `16:9`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Other => "other",
        }
    }

    /// Storage key prefix, including the trailing slash.
    pub fn key_prefix(self) -> &'static str {
        match self {
            Self::Landscape => "landscape/",
            Self::Portrait => "portrait/",
            Self::Other => "other/",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
