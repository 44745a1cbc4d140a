//! Object Store Gateway: durable storage for processed videos.
//!
//! Two backends implement [`ObjectStore`]: S3 (and S3-compatible stores)
//! for production, and a sharded local directory for development. Both
//! share the bucket and key rules below.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use std::{io, path::Path, time::Duration};
use thiserror::Error;

use crate::models::media_type::extension_for;

pub mod local;
pub mod s3;

pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("invalid object key `{0}`")]
    InvalidObjectKey(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("upload of `{key}` failed: {message}")]
    Upload { key: String, message: String },
    #[error("could not presign `{key}`: {message}")]
    Presign { key: String, message: String },
    #[error("signed url expired")]
    Expired,
    #[error("signed url signature mismatch")]
    InvalidSignature,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// Durable storage for finished uploads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket new objects are written to.
    fn bucket(&self) -> &str;

    /// Store the file at `source` under `key`.
    ///
    /// Either the whole object becomes visible or the call fails. No retry
    /// is attempted.
    async fn put_object(&self, key: &str, source: &Path, content_type: &str)
    -> ObjectStoreResult<()>;

    /// Mint a time-limited URL granting anonymous read access to an object.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String>;
}

/// Generate a storage key `<prefix><random><.ext>`.
///
/// The random part is 32 bytes from the thread-local CSPRNG, URL-safe base64
/// without padding (43 characters). `prefix` is used verbatim, so pass the
/// trailing slash if you want one.
pub fn asset_key(prefix: &str, media_type: &str) -> String {
    let mut raw = [0u8; 32];
    rand::rng().fill_bytes(&mut raw);
    let id = URL_SAFE_NO_PAD.encode(raw);
    format!("{prefix}{id}{}", extension_for(media_type))
}

/// Basic key validation to avoid trivial path traversal vectors.
///
/// Rejects empty or oversized keys, keys that begin with `/`, contain `..`,
/// backslashes or control characters.
pub fn validate_object_key(key: &str) -> ObjectStoreResult<()> {
    let invalid = key.is_empty()
        || key.len() > MAX_OBJECT_KEY_LEN
        || key.starts_with('/')
        || key.contains("..")
        || key.bytes().any(|b| b.is_ascii_control() || b == b'\\');
    if invalid {
        return Err(ObjectStoreError::InvalidObjectKey(key.to_string()));
    }
    Ok(())
}

/// Validate bucket name format.
///
/// Enforces S3-like naming rules:
/// - 3–63 characters
/// - lowercase letters, digits, dots, hyphens only
/// - cannot start/end with dot or hyphen
/// - cannot contain consecutive dots or dot-hyphen patterns
/// - cannot look like an IPv4 address
pub fn validate_bucket_name(name: &str) -> ObjectStoreResult<()> {
    let reject = |reason: &str| {
        Err(ObjectStoreError::InvalidBucketName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    let len = name.len();
    if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
        return reject("must be between 3 and 63 characters");
    }
    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return reject("allowed characters are lowercase letters, digits, dots, and hyphens");
    }
    if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
        return reject("must start and end with a lowercase letter or digit");
    }
    if name.contains("..") || name.contains("-.") || name.contains(".-") {
        return reject("cannot contain consecutive dots or dot-hyphen combinations");
    }
    if is_ipv4_like(name) {
        return reject("must not be formatted like an IP address");
    }
    Ok(())
}

/// Check if a string matches IPv4-like dotted decimal form.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|segment| {
            !segment.is_empty()
                && segment.len() <= 3
                && segment.chars().all(|c| c.is_ascii_digit())
                && segment.parse::<u8>().is_ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn asset_keys_are_prefixed_and_unique() {
        let keys: HashSet<String> = (0..256).map(|_| asset_key("portrait/", "video/mp4")).collect();
        assert_eq!(keys.len(), 256);
        for key in &keys {
            let id = key
                .strip_prefix("portrait/")
                .and_then(|rest| rest.strip_suffix(".mp4"))
                .unwrap();
            assert_eq!(id.len(), 43);
            assert!(id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
        }
    }

    #[test]
    fn asset_key_falls_back_to_bin() {
        assert!(asset_key("other/", "garbage").ends_with(".bin"));
    }

    #[test]
    fn key_rules() {
        assert!(validate_object_key("landscape/abc.mp4").is_ok());
        assert!(validate_object_key("").is_err());
        assert!(validate_object_key("/etc/passwd").is_err());
        assert!(validate_object_key("a/../b").is_err());
        assert!(validate_object_key("a\\b").is_err());
        assert!(validate_object_key("a\nb").is_err());
        assert!(validate_object_key(&"k".repeat(1025)).is_err());
    }

    #[test]
    fn bucket_rules() {
        assert!(validate_bucket_name("tubely-private").is_ok());
        assert!(validate_bucket_name("my.videos.2025").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("Upper").is_err());
        assert!(validate_bucket_name("-leading").is_err());
        assert!(validate_bucket_name("trailing.").is_err());
        assert!(validate_bucket_name("a..b").is_err());
        assert!(validate_bucket_name("a.-b").is_err());
        assert!(validate_bucket_name("192.168.1.10").is_err());
        assert!(validate_bucket_name("300.168.1.10").is_ok());
    }
}
