use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, error};

use crate::config::MediaConfig;
use crate::error::MediaError;
use crate::probe::ProbeOutput;
use crate::traits::MediaToolkit;

/// [`MediaToolkit`] backed by the ffmpeg and ffprobe binaries.
#[derive(Debug, Clone, Default)]
pub struct Ffmpeg {
    config: MediaConfig,
}

impl Ffmpeg {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    /// Whether both binaries can be executed.
    pub async fn is_available(&self) -> bool {
        for bin in [&self.config.ffmpeg_path, &self.config.ffprobe_path] {
            let ok = Command::new(bin)
                .arg("-version")
                .output()
                .await
                .map(|out| out.status.success())
                .unwrap_or(false);
            if !ok {
                return false;
            }
        }
        true
    }
}

fn probe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-print_format".into(),
        "json".into(),
        "-show_format".into(),
        "-show_streams".into(),
        path.to_string_lossy().into_owned(),
    ]
}

/// Filter chain for thumbnails: optional letterbox to `aspect`, then scale to `height`.
fn thumbnail_filter(height: u32, aspect: Option<&str>) -> String {
    let scale = format!("scale=-1:{height}");
    match aspect {
        Some(a) => format!(
            "pad=w='max(iw,ih*({a}))':h='ow/({a})':x='(ow-iw)/2':y='(oh-ih)/2',{scale}"
        ),
        None => scale,
    }
}

fn thumbnail_args(input: &Path, output: &Path, filter: &str) -> Vec<String> {
    vec![
        "-y".into(),
        "-ss".into(),
        "0".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-vf".into(),
        filter.to_string(),
        "-frames:v".into(),
        "1".into(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Sample aspect ratio for re-encoding; unset or `0:1` means square pixels
/// relative to the frame.
fn effective_sar(sar: Option<&str>, width: i32, height: i32) -> String {
    match sar {
        Some(s) if !s.is_empty() && s != "0:1" => s.to_string(),
        _ => format!("{width}:{height}"),
    }
}

fn reencode_args(input: &Path, output: &Path, width: i32, height: i32, sar: &str) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-f".into(),
        "mp4".into(),
        "-c:v".into(),
        "libx264".into(),
        "-c:a".into(),
        "aac".into(),
        "-strict".into(),
        "experimental".into(),
        "-preset".into(),
        "medium".into(),
        "-vf".into(),
        format!("scale={width}:{height},setsar={sar},setdar={width}/{height}"),
        output.to_string_lossy().into_owned(),
    ]
}

/// `dir/temp_<name>` next to the file being re-encoded.
fn temp_sibling(path: &Path) -> Result<PathBuf, MediaError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MediaError::Tool("re-encode target has no file name".into()))?;
    Ok(path.with_file_name(format!("temp_{name}")))
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join("\n")
}

async fn run(bin: &str, args: &[String]) -> Result<std::process::Output, MediaError> {
    debug!(bin, ?args, "running media tool");
    Command::new(bin)
        .args(args)
        .output()
        .await
        .map_err(|err| MediaError::Tool(format!("failed to execute {bin}: {err}")))
}

#[async_trait]
impl MediaToolkit for Ffmpeg {
    async fn probe(&self, path: &Path) -> Result<ProbeOutput, MediaError> {
        let output = run(&self.config.ffprobe_path, &probe_args(path)).await?;
        if !output.status.success() {
            return Err(MediaError::Probe(stderr_tail(&output.stderr)));
        }
        serde_json::from_slice(&output.stdout).map_err(|e| MediaError::Parse(e.to_string()))
    }

    async fn thumbnail(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        let filter = thumbnail_filter(
            self.config.thumbnail_height,
            self.config.thumbnail_aspect.as_deref(),
        );
        let out = run(
            &self.config.ffmpeg_path,
            &thumbnail_args(input, output, &filter),
        )
        .await?;
        if !out.status.success() {
            let tail = stderr_tail(&out.stderr);
            error!(stderr = %tail, "ffmpeg thumbnail failed");
            return Err(MediaError::Tool(format!("thumbnail generation failed: {tail}")));
        }
        Ok(())
    }

    async fn reencode(&self, path: &Path) -> Result<(), MediaError> {
        let probe = self.probe(path).await?;
        let video = probe.video_stream().ok_or(MediaError::NoVideoStream)?;
        let (width, height) = match (video.width, video.height) {
            (Some(w), Some(h)) => (w, h),
            _ => return Err(MediaError::Parse("video stream has no dimensions".into())),
        };
        let sar = effective_sar(video.sample_aspect_ratio.as_deref(), width, height);

        let temp = temp_sibling(path)?;
        let out = run(
            &self.config.ffmpeg_path,
            &reencode_args(path, &temp, width, height, &sar),
        )
        .await;

        match out {
            Ok(out) if out.status.success() => {}
            Ok(out) => {
                let _ = fs::remove_file(&temp).await;
                let tail = stderr_tail(&out.stderr);
                error!(stderr = %tail, "ffmpeg re-encode failed");
                return Err(MediaError::Tool(format!("re-encode failed: {tail}")));
            }
            Err(e) => {
                let _ = fs::remove_file(&temp).await;
                return Err(e);
            }
        }

        if let Err(e) = fs::rename(&temp, path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }
}
