use anyhow::Result;
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, io::ErrorKind, path::Path, str::FromStr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tubely_ingest::{
    config::{AppConfig, ObjectBackend, ThumbnailBackend},
    routes,
    services::{
        identity::JwtVerifier,
        ingest_service::{IngestService, IngestSettings},
        media::{FfmpegFastStart, FfprobeClassifier},
        object_store::{LocalObjectStore, ObjectStore, S3ObjectStore, s3::S3Settings},
        thumbnail_store::{DiskThumbnailStore, MemoryThumbnailStore, ThumbnailStore},
        video_store::SqliteVideoStore,
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting tubely-ingest with config: {:?}", cfg);

    // --- Ensure local directories exist ---
    for dir in [&cfg.scratch_dir, &cfg.assets_root] {
        if !Path::new(dir).exists() {
            fs::create_dir_all(dir)?;
            tracing::info!("Created directory at {}", dir);
        }
    }

    // --- Initialize SQLite connection ---
    let connect_options = SqliteConnectOptions::from_str(&cfg.database_url)?.create_if_missing(true);
    if let Some(parent) = Path::new(connect_options.get_filename()).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?,
    );
    let video_store = Arc::new(SqliteVideoStore::new(db));

    // --- Handle migration mode ---
    if migrate {
        let count = video_store.run_migrations().await?;
        tracing::info!("Database migration complete ({} statements).", count);
        return Ok(()); // exit after migration
    }

    // --- Initialize collaborators ---
    let mut local_objects = None;
    let objects: Arc<dyn ObjectStore> = match cfg.object_backend {
        ObjectBackend::S3 => Arc::new(
            S3ObjectStore::new(&S3Settings {
                bucket: cfg.s3_bucket.clone(),
                region: cfg.s3_region.clone(),
                endpoint_url: cfg.s3_endpoint_url.clone(),
                force_path_style: cfg.s3_force_path_style,
            })
            .await?,
        ),
        ObjectBackend::Local => {
            let store = Arc::new(LocalObjectStore::new(
                &cfg.local_object_root,
                cfg.s3_bucket.clone(),
                cfg.public_base_url.clone(),
                cfg.object_signing_secret.as_bytes().to_vec(),
            )?);
            local_objects = Some(store.clone());
            store as Arc<dyn ObjectStore>
        }
    };

    let thumbnails: Arc<dyn ThumbnailStore> = match cfg.thumbnail_backend {
        ThumbnailBackend::Disk => Arc::new(DiskThumbnailStore::new(&cfg.assets_root)),
        ThumbnailBackend::Memory => Arc::new(MemoryThumbnailStore::new()),
    };

    let ingest = IngestService::new(
        video_store.clone(),
        Arc::new(FfprobeClassifier::new(&cfg.ffprobe_path)),
        Arc::new(FfmpegFastStart::new(&cfg.ffmpeg_path)),
        objects,
        thumbnails.clone(),
        IngestSettings {
            scratch_dir: cfg.scratch_dir.clone().into(),
            max_video_bytes: cfg.max_video_upload_bytes,
            max_thumbnail_bytes: cfg.max_thumbnail_upload_bytes,
            location_mode: cfg.location_mode,
            cdn_distribution: cfg.cdn_distribution.clone(),
            public_base_url: cfg.public_base_url.clone(),
            presign_expiry: Duration::from_secs(cfg.presign_expiry_secs),
        },
    );

    let state = AppState {
        ingest,
        identity: Arc::new(JwtVerifier::new(&cfg.jwt_secret)),
        videos: video_store,
        thumbnails,
        local_objects,
        scratch_dir: cfg.scratch_dir.clone().into(),
    };

    // --- Build router ---
    let app: Router = routes::routes(cfg.max_video_upload_bytes, cfg.max_thumbnail_upload_bytes)
        .with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
