use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use media::Ffmpeg;
use tracing::{Level, info, warn};

use sampledb::config::AppConfig;
use sampledb::ingest::PendingUploads;
use sampledb::state::AppState;
use sampledb::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load config")?;
    config
        .storage
        .ensure_dirs()
        .context("Failed to create media directories")?;

    let db = database::init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    seed::seed_tag_categories(&db)
        .await
        .context("Failed to seed tag categories")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;
    seed::bootstrap_admin(&db, config.admin.as_ref()).await?;

    let ffmpeg = Ffmpeg::new(config.media.clone());
    if !ffmpeg.is_available().await {
        warn!(
            ffmpeg = %config.media.ffmpeg_path,
            ffprobe = %config.media.ffprobe_path,
            "ffmpeg/ffprobe not found; uploads will fail"
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let pending = PendingUploads::with_ttl(config.upload.pending_ttl());
    let state = AppState {
        db,
        config,
        media: Arc::new(ffmpeg),
        pending,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
