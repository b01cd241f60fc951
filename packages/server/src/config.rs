use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use media::MediaConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued bearer tokens.
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
    /// When false, new accounts start out verified.
    #[serde(default)]
    pub require_verification: bool,
}

fn default_token_ttl_days() -> i64 {
    7
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Per-file limit in megabytes (10^6 bytes).
    pub mb_limit: u64,
    pub max_files: usize,
    /// Maximum byte length of a sanitized filename stem.
    pub max_name_len: usize,
    /// Sniffed extensions accepted as-is.
    pub allowed_extensions: Vec<String>,
    /// Sniffed extensions accepted only with a forced re-encode.
    pub reencode_extensions: Vec<String>,
    /// Minutes an upload stays pending without being edited.
    #[serde(default = "default_pending_ttl_mins")]
    pub pending_ttl_mins: u64,
}

fn default_pending_ttl_mins() -> u64 {
    24 * 60
}

impl UploadConfig {
    pub fn max_bytes(&self) -> u64 {
        self.mb_limit * 1000 * 1000
    }

    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_ttl_mins.saturating_mul(60))
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            mb_limit: 10,
            max_files: 10,
            max_name_len: 100,
            allowed_extensions: vec!["mp4".into()],
            reencode_extensions: vec!["m4v".into()],
            pending_ttl_mins: default_pending_ttl_mins(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub samples_dir: PathBuf,
    pub thumbnails_dir: PathBuf,
    pub wiki_dir: PathBuf,
    pub changelog_dir: PathBuf,
}

impl StorageConfig {
    /// Create the media directories if they do not exist yet.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.samples_dir)?;
        std::fs::create_dir_all(&self.thumbnails_dir)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    pub samples_per_page: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    pub version: String,
}

/// Account created on startup if no user with this name exists.
#[derive(Debug, Deserialize, Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub upload: UploadConfig,
    pub storage: StorageConfig,
    pub listing: ListingConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub admin: Option<AdminBootstrap>,
    #[serde(default)]
    pub media: MediaConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://sampledb.sqlite?mode=rwc")?
            .set_default("upload.mb_limit", 10)?
            .set_default("upload.max_files", 10)?
            .set_default("upload.max_name_len", 100)?
            .set_default("upload.allowed_extensions", vec!["mp4"])?
            .set_default("upload.reencode_extensions", vec!["m4v"])?
            .set_default("storage.samples_dir", "./media/samps")?
            .set_default("storage.thumbnails_dir", "./media/thumbs")?
            .set_default("storage.wiki_dir", "./wiki")?
            .set_default("storage.changelog_dir", "./changelogs")?
            .set_default("listing.samples_per_page", 20)?
            .set_default("site.version", env!("CARGO_PKG_VERSION"))?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., SAMPLEDB__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("SAMPLEDB").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
