use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::{env, fmt, str::FromStr};

use crate::models::location::LocationMode;

/// Where processed videos are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ObjectBackend {
    S3,
    Local,
}

/// Where thumbnails are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThumbnailBackend {
    Disk,
    Memory,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Parent directory for per-request scratch files.
    pub scratch_dir: String,
    /// Root directory for disk-backed thumbnails.
    pub assets_root: String,
    pub thumbnail_backend: ThumbnailBackend,
    /// Base URL this service is reachable at, used in generated links.
    pub public_base_url: String,
    pub jwt_secret: String,
    pub object_backend: ObjectBackend,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint_url: Option<String>,
    pub s3_force_path_style: bool,
    pub local_object_root: String,
    pub object_signing_secret: String,
    pub cdn_distribution: String,
    pub location_mode: LocationMode,
    pub presign_expiry_secs: u64,
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub max_video_upload_bytes: u64,
    pub max_thumbnail_upload_bytes: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Video ingest pipeline API")]
pub struct Args {
    /// Host to bind to (overrides TUBELY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides TUBELY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides TUBELY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory uploads are buffered in (overrides TUBELY_SCRATCH_DIR)
    #[arg(long)]
    pub scratch_dir: Option<String>,

    /// Directory for disk thumbnails (overrides TUBELY_ASSETS_ROOT)
    #[arg(long)]
    pub assets_root: Option<String>,

    /// Thumbnail backend (overrides TUBELY_THUMBNAIL_BACKEND)
    #[arg(long, value_enum)]
    pub thumbnail_backend: Option<ThumbnailBackend>,

    /// Public base URL (overrides TUBELY_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Object store backend (overrides TUBELY_OBJECT_BACKEND)
    #[arg(long, value_enum)]
    pub object_backend: Option<ObjectBackend>,

    /// Bucket for processed videos (overrides TUBELY_S3_BUCKET)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// S3 region (overrides TUBELY_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Custom S3 endpoint, e.g. MinIO (overrides TUBELY_S3_ENDPOINT_URL)
    #[arg(long)]
    pub s3_endpoint_url: Option<String>,

    /// Directory for the local object backend (overrides TUBELY_LOCAL_OBJECT_ROOT)
    #[arg(long)]
    pub local_object_root: Option<String>,

    /// CDN distribution host (overrides TUBELY_CDN_DISTRIBUTION)
    #[arg(long)]
    pub cdn_distribution: Option<String>,

    /// How uploads are referenced from records (overrides TUBELY_LOCATION_MODE)
    #[arg(long, value_enum)]
    pub location_mode: Option<LocationMode>,

    /// ffprobe binary (overrides TUBELY_FFPROBE_PATH)
    #[arg(long)]
    pub ffprobe_path: Option<String>,

    /// ffmpeg binary (overrides TUBELY_FFMPEG_PATH)
    #[arg(long)]
    pub ffmpeg_path: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_port = env_parse("TUBELY_PORT", 8091)?;
        let port = args.port.unwrap_or(env_port);

        let object_backend = match args.object_backend {
            Some(backend) => backend,
            None => env_enum("TUBELY_OBJECT_BACKEND", ObjectBackend::S3)?,
        };
        let thumbnail_backend = match args.thumbnail_backend {
            Some(backend) => backend,
            None => env_enum("TUBELY_THUMBNAIL_BACKEND", ThumbnailBackend::Disk)?,
        };
        let location_mode = match args.location_mode {
            Some(mode) => mode,
            None => env_enum("TUBELY_LOCATION_MODE", LocationMode::Signed)?,
        };

        let jwt_secret = env::var("TUBELY_JWT_SECRET").context("TUBELY_JWT_SECRET must be set")?;
        let object_signing_secret =
            env::var("TUBELY_OBJECT_SIGNING_SECRET").unwrap_or_else(|_| jwt_secret.clone());

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or_else(|| env_or("TUBELY_HOST", "0.0.0.0")),
            port,
            database_url: args
                .database_url
                .unwrap_or_else(|| env_or("TUBELY_DATABASE_URL", "sqlite://./data/tubely.db")),
            scratch_dir: args.scratch_dir.unwrap_or_else(|| {
                env::var("TUBELY_SCRATCH_DIR")
                    .unwrap_or_else(|_| env::temp_dir().to_string_lossy().into_owned())
            }),
            assets_root: args
                .assets_root
                .unwrap_or_else(|| env_or("TUBELY_ASSETS_ROOT", "./data/assets")),
            thumbnail_backend,
            public_base_url: args.public_base_url.unwrap_or_else(|| {
                env::var("TUBELY_PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| format!("http://localhost:{port}"))
            }),
            jwt_secret,
            object_backend,
            s3_bucket: args
                .s3_bucket
                .unwrap_or_else(|| env_or("TUBELY_S3_BUCKET", "tubely-private")),
            s3_region: args
                .s3_region
                .unwrap_or_else(|| env_or("TUBELY_S3_REGION", "us-east-1")),
            s3_endpoint_url: args
                .s3_endpoint_url
                .or_else(|| env::var("TUBELY_S3_ENDPOINT_URL").ok()),
            s3_force_path_style: env_parse("TUBELY_S3_FORCE_PATH_STYLE", false)?,
            local_object_root: args
                .local_object_root
                .unwrap_or_else(|| env_or("TUBELY_LOCAL_OBJECT_ROOT", "./data/objects")),
            object_signing_secret,
            cdn_distribution: args
                .cdn_distribution
                .unwrap_or_else(|| env_or("TUBELY_CDN_DISTRIBUTION", "")),
            location_mode,
            presign_expiry_secs: env_parse("TUBELY_PRESIGN_EXPIRY_SECS", 15 * 60)?,
            ffprobe_path: args
                .ffprobe_path
                .unwrap_or_else(|| env_or("TUBELY_FFPROBE_PATH", "ffprobe")),
            ffmpeg_path: args
                .ffmpeg_path
                .unwrap_or_else(|| env_or("TUBELY_FFMPEG_PATH", "ffmpeg")),
            max_video_upload_bytes: env_parse("TUBELY_MAX_VIDEO_UPLOAD_BYTES", 1 << 30)?,
            max_thumbnail_upload_bytes: env_parse("TUBELY_MAX_THUMBNAIL_UPLOAD_BYTES", 10 << 20)?,
        };

        if cfg.location_mode == LocationMode::Cdn && cfg.cdn_distribution.is_empty() {
            anyhow::bail!("TUBELY_CDN_DISTRIBUTION must be set when location mode is `cdn`");
        }

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("scratch_dir", &self.scratch_dir)
            .field("assets_root", &self.assets_root)
            .field("thumbnail_backend", &self.thumbnail_backend)
            .field("public_base_url", &self.public_base_url)
            .field("jwt_secret", &"<redacted>")
            .field("object_backend", &self.object_backend)
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_region", &self.s3_region)
            .field("s3_endpoint_url", &self.s3_endpoint_url)
            .field("s3_force_path_style", &self.s3_force_path_style)
            .field("local_object_root", &self.local_object_root)
            .field("object_signing_secret", &"<redacted>")
            .field("cdn_distribution", &self.cdn_distribution)
            .field("location_mode", &self.location_mode)
            .field("presign_expiry_secs", &self.presign_expiry_secs)
            .field("ffprobe_path", &self.ffprobe_path)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("max_video_upload_bytes", &self.max_video_upload_bytes)
            .field("max_thumbnail_upload_bytes", &self.max_thumbnail_upload_bytes)
            .finish()
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.into())
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

fn env_enum<T: ValueEnum>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(value) => T::from_str(&value, true)
            .map_err(|err| anyhow::anyhow!("parsing {} value `{}`: {}", name, value, err)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_enums_parse_case_insensitively() {
        assert_eq!(ObjectBackend::from_str("S3", true).unwrap(), ObjectBackend::S3);
        assert_eq!(
            ThumbnailBackend::from_str("memory", true).unwrap(),
            ThumbnailBackend::Memory
        );
        assert_eq!(
            LocationMode::from_str("CDN", true).unwrap(),
            LocationMode::Cdn
        );
        assert!(ObjectBackend::from_str("gcs", true).is_err());
    }

    #[test]
    fn missing_variables_fall_back_to_defaults() {
        assert_eq!(
            env_parse::<u64>("TUBELY_TEST_UNSET_NUMBER", 42).unwrap(),
            42
        );
        assert_eq!(
            env_enum("TUBELY_TEST_UNSET_BACKEND", ObjectBackend::Local).unwrap(),
            ObjectBackend::Local
        );
        assert_eq!(env_or("TUBELY_TEST_UNSET_STRING", "x"), "x");
    }
}
