use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// An upload waiting for its first edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub user_id: i32,
    pub filename: String,
    /// Container needs converting before the sample is usable.
    pub force_reencode: bool,
}

#[derive(Debug)]
struct Entry {
    upload: PendingUpload,
    registered: Instant,
}

/// Per-sample registry of uploads that have not been confirmed yet.
///
/// Only a pending upload may request a re-encode; the entry is consumed by
/// the first edit of the sample. Entries older than the TTL are treated as
/// gone and swept out on the next registration.
#[derive(Debug, Clone)]
pub struct PendingUploads {
    inner: Arc<DashMap<i32, Entry>>,
    ttl: Duration,
}

impl Default for PendingUploads {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }
}

impl PendingUploads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    fn is_live(&self, entry: &Entry) -> bool {
        entry.registered.elapsed() < self.ttl
    }

    pub fn register(&self, sample_id: i32, upload: PendingUpload) {
        self.inner.retain(|_, entry| self.is_live(entry));
        self.inner.insert(
            sample_id,
            Entry {
                upload,
                registered: Instant::now(),
            },
        );
        debug!(sample_id, pending = self.inner.len(), "Registered pending upload");
    }

    /// The pending entry for `sample_id` if it belongs to `user_id`.
    pub fn get_for(&self, sample_id: i32, user_id: i32) -> Option<PendingUpload> {
        self.inner
            .get(&sample_id)
            .filter(|entry| entry.upload.user_id == user_id && self.is_live(entry))
            .map(|entry| entry.upload.clone())
    }

    /// Remove and return the entry for `sample_id` if it belongs to
    /// `user_id`. At most one caller gets it.
    pub fn take_for(&self, sample_id: i32, user_id: i32) -> Option<PendingUpload> {
        self.inner
            .remove_if(&sample_id, |_, entry| entry.upload.user_id == user_id)
            .map(|(_, entry)| entry)
            .filter(|entry| self.is_live(entry))
            .map(|entry| entry.upload)
    }

    pub fn clear(&self, sample_id: i32) -> Option<PendingUpload> {
        self.inner.remove(&sample_id).map(|(_, entry)| entry.upload)
    }
}
