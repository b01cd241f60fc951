use serde::Deserialize;

/// Media tool configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Path or name of the ffmpeg binary. Default: "ffmpeg".
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    /// Path or name of the ffprobe binary. Default: "ffprobe".
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
    /// Height of generated thumbnails in pixels. Default: 480.
    #[serde(default = "default_thumbnail_height")]
    pub thumbnail_height: u32,
    /// Aspect ratio thumbnails are letterboxed to, as an ffmpeg expression
    /// (e.g. "16/9"). `None` keeps the source aspect. Default: "16/9".
    #[serde(default = "default_thumbnail_aspect")]
    pub thumbnail_aspect: Option<String>,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".into()
}
fn default_ffprobe_path() -> String {
    "ffprobe".into()
}
fn default_thumbnail_height() -> u32 {
    480
}
fn default_thumbnail_aspect() -> Option<String> {
    Some("16/9".into())
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            thumbnail_height: default_thumbnail_height(),
            thumbnail_aspect: default_thumbnail_aspect(),
        }
    }
}
