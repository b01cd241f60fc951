use serde::{Deserialize, Serialize};

use crate::error::MediaError;

/// Output of `ffprobe -print_format json -show_format -show_streams`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeOutput {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    #[serde(default)]
    pub format: ProbeFormat,
}

/// The subset of per-stream fields the application reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeStream {
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub sample_aspect_ratio: Option<String>,
    pub display_aspect_ratio: Option<String>,
    pub r_frame_rate: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeFormat {
    pub format_name: Option<String>,
    /// Size in bytes. ffprobe reports it as a string.
    pub size: Option<String>,
    pub duration: Option<String>,
}

/// Technical properties of a stored video, derived from a probe.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub filesize: i64,
    pub width: i32,
    pub height: i32,
    pub aspect_ratio: String,
    pub framerate: f64,
    pub codec: String,
}

impl ProbeOutput {
    /// First stream with `codec_type == "video"`.
    pub fn video_stream(&self) -> Option<&ProbeStream> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
    }
}

impl VideoMetadata {
    pub fn from_probe(probe: &ProbeOutput) -> Result<Self, MediaError> {
        let video = probe.video_stream().ok_or(MediaError::NoVideoStream)?;

        let width = video
            .width
            .ok_or_else(|| MediaError::Parse("video stream has no width".into()))?;
        let height = video
            .height
            .ok_or_else(|| MediaError::Parse("video stream has no height".into()))?;

        let framerate = video
            .r_frame_rate
            .as_deref()
            .ok_or_else(|| MediaError::Parse("video stream has no frame rate".into()))
            .and_then(parse_frame_rate)?;

        let codec = video
            .codec_name
            .clone()
            .ok_or_else(|| MediaError::Parse("video stream has no codec".into()))?;

        let aspect_ratio = match video.display_aspect_ratio.as_deref() {
            Some(dar) if dar != "0:1" && !dar.is_empty() => dar.to_string(),
            _ => reduced_ratio(width, height),
        };

        let filesize = probe
            .format
            .size
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| MediaError::Parse("container has no size".into()))?;

        Ok(Self {
            filesize,
            width,
            height,
            aspect_ratio,
            framerate,
            codec,
        })
    }
}

/// Parse an ffprobe rational such as `"30000/1001"` into frames per second.
pub fn parse_frame_rate(raw: &str) -> Result<f64, MediaError> {
    let invalid = || MediaError::Parse(format!("invalid frame rate: {raw}"));

    let (num, den) = match raw.split_once('/') {
        Some((n, d)) => (n.trim(), d.trim()),
        None => (raw.trim(), "1"),
    };
    let num: f64 = num.parse().map_err(|_| invalid())?;
    let den: f64 = den.parse().map_err(|_| invalid())?;
    if den == 0.0 {
        return Err(invalid());
    }
    Ok(num / den)
}

/// `W:H` reduced by their greatest common divisor.
pub fn reduced_ratio(width: i32, height: i32) -> String {
    fn gcd(a: i32, b: i32) -> i32 {
        if b == 0 { a } else { gcd(b, a % b) }
    }
    let divisor = gcd(width.abs(), height.abs()).max(1);
    format!("{}:{}", width / divisor, height / divisor)
}
