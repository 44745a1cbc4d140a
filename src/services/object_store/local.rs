//! Local-disk backend for the Object Store Gateway.
//!
//! Payloads are sharded beneath `root/{bucket}/{shard}/{shard}/{key}`.
//! Presigned URLs point back at this service and carry an HMAC-SHA256
//! signature over bucket, key and expiry.

use super::{
    ObjectStore, ObjectStoreError, ObjectStoreResult, validate_bucket_name, validate_object_key,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::{StreamExt, pin_mut};
use hmac::{Hmac, Mac};
use md5::Context;
use sha2::Sha256;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub struct LocalObjectStore {
    root: PathBuf,
    bucket: String,
    /// Base URL presigned links are built on, e.g. `http://localhost:8091`.
    public_base_url: String,
    signing_key: Vec<u8>,
}

impl LocalObjectStore {
    pub fn new(
        root: impl Into<PathBuf>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
        signing_key: impl Into<Vec<u8>>,
    ) -> ObjectStoreResult<Self> {
        let bucket = bucket.into();
        validate_bucket_name(&bucket)?;
        Ok(Self {
            root: root.into(),
            bucket,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            signing_key: signing_key.into(),
        })
    }

    /// Two-level shard identifiers from MD5(bucket/key).
    fn object_shards(bucket: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{bucket}/{key}"));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(bucket, key);
        let mut path = self.root.clone();
        path.push(bucket);
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    fn signature(&self, bucket: &str, key: &str, expires: i64) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.signing_key).expect("HMAC accepts any key size");
        mac.update(format!("{bucket}\n{key}\n{expires}").as_bytes());
        mac
    }

    /// Check a presigned request's expiry and signature.
    pub fn verify(
        &self,
        bucket: &str,
        key: &str,
        expires: i64,
        signature: &str,
    ) -> ObjectStoreResult<()> {
        if Utc::now().timestamp() > expires {
            return Err(ObjectStoreError::Expired);
        }
        let provided = hex::decode(signature).map_err(|_| ObjectStoreError::InvalidSignature)?;
        self.signature(bucket, key, expires)
            .verify_slice(&provided)
            .map_err(|_| ObjectStoreError::InvalidSignature)
    }

    /// Open a stored object for streaming out, with its size.
    pub async fn open_object(&self, bucket: &str, key: &str) -> ObjectStoreResult<(File, u64)> {
        validate_bucket_name(bucket)?;
        validate_object_key(key)?;

        let not_found = || ObjectStoreError::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
        let file = File::open(self.object_path(bucket, key))
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => not_found(),
                _ => ObjectStoreError::Io(err),
            })?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Stream the source into a temporary sibling, fsync, then rename into
    /// place so readers never see a partial object.
    #[instrument(skip(self, source, _content_type), fields(bucket = %self.bucket))]
    async fn put_object(
        &self,
        key: &str,
        source: &Path,
        _content_type: &str,
    ) -> ObjectStoreResult<()> {
        validate_object_key(key)?;

        let file_path = self.object_path(&self.bucket, key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            ObjectStoreError::Io(io::Error::other("object path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let result = async {
            let mut file = File::create(&tmp_path).await?;
            let stream = ReaderStream::new(File::open(source).await?);
            pin_mut!(stream);

            let mut size_bytes: u64 = 0;
            let mut digest = Context::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                size_bytes += chunk.len() as u64;
                digest.consume(&chunk);
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, &file_path).await?;
            Ok::<_, io::Error>((size_bytes, format!("{:x}", digest.compute())))
        }
        .await;

        match result {
            Ok((size_bytes, etag)) => {
                debug!(size_bytes, %etag, path = %file_path.display(), "object stored");
                Ok(())
            }
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                Err(ObjectStoreError::Upload {
                    key: key.to_string(),
                    message: err.to_string(),
                })
            }
        }
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String> {
        validate_bucket_name(bucket)?;
        validate_object_key(key)?;

        let expires = Utc::now().timestamp() + expires_in.as_secs() as i64;
        let signature = hex::encode(self.signature(bucket, key, expires).finalize().into_bytes());
        Ok(format!(
            "{}/objects/{bucket}/{key}?expires={expires}&signature={signature}",
            self.public_base_url
        ))
    }
}
