use std::path::Path;

use async_trait::async_trait;

use crate::error::MediaError;
use crate::probe::ProbeOutput;

/// The three operations the application needs from a media tool.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Describe the container and streams of `path`.
    async fn probe(&self, path: &Path) -> Result<ProbeOutput, MediaError>;

    /// Write a single scaled frame of `input` to `output`.
    async fn thumbnail(&self, input: &Path, output: &Path) -> Result<(), MediaError>;

    /// Re-encode `path` in place to H.264/AAC mp4.
    ///
    /// The original is only replaced once the new file is complete.
    async fn reencode(&self, path: &Path) -> Result<(), MediaError>;
}
