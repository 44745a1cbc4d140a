//! Declared media types of uploaded files.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed media type `{0}`")]
pub struct MediaTypeError(pub String);

/// A parsed `type/subtype` media type, lowercased and stripped of parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    essence: String,
    slash: usize,
}

impl MediaType {
    /// Parse a `Content-Type` style value such as `video/mp4; codecs="avc1"`.
    pub fn parse(raw: &str) -> Result<Self, MediaTypeError> {
        let essence = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let slash = essence
            .find('/')
            .ok_or_else(|| MediaTypeError(raw.to_string()))?;
        let (top, sub) = (&essence[..slash], &essence[slash + 1..]);
        if !is_token(top) || !is_token(sub) {
            return Err(MediaTypeError(raw.to_string()));
        }

        Ok(Self { essence, slash })
    }

    /// The bare `type/subtype` string.
    pub fn essence(&self) -> &str {
        &self.essence
    }

    pub fn subtype(&self) -> &str {
        &self.essence[self.slash + 1..]
    }

    /// True when this media type is one of `allowed`.
    pub fn is_one_of(&self, allowed: &[&str]) -> bool {
        allowed.iter().any(|candidate| *candidate == self.essence)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.essence)
    }
}

/// File extension for a media type, including the leading dot.
///
/// The subtype is used verbatim; anything not shaped like `type/subtype`
/// falls back to `.bin`.
pub fn extension_for(media_type: &str) -> String {
    let parts: Vec<&str> = media_type.split('/').collect();
    if parts.len() != 2 {
        return ".bin".to_string();
    }
    format!(".{}", parts[1])
}

/// RFC 2045 token characters.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}
