//! Wrappers around the external ffmpeg/ffprobe binaries.
//!
//! All operations run the tool as a subprocess and wait for it to exit. There is
//! no retry and no timeout: a hung tool stalls the caller.

pub mod config;
mod error;
pub mod ffmpeg;
pub mod probe;
mod traits;

pub use config::MediaConfig;
pub use error::MediaError;
pub use ffmpeg::Ffmpeg;
pub use probe::{ProbeFormat, ProbeOutput, ProbeStream, VideoMetadata};
pub use traits::MediaToolkit;
