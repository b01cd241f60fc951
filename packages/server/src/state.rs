use std::sync::Arc;

use media::MediaToolkit;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::ingest::PendingUploads;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub media: Arc<dyn MediaToolkit>,
    /// Samples uploaded but not yet confirmed through an edit.
    pub pending: PendingUploads,
}
