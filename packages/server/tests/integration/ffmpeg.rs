use std::process::Command;

use crate::common::{TestApp, routes};

/// Render a one second test pattern clip with the local ffmpeg.
fn render_clip(dir: &std::path::Path) -> Option<Vec<u8>> {
    let path = dir.join("clip.mp4");
    let status = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i"])
        .arg("testsrc=duration=1:size=320x240:rate=25")
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
        .arg(&path)
        .status()
        .ok()?;
    if !status.success() {
        eprintln!("ffmpeg could not render a test clip, skipping");
        return None;
    }
    std::fs::read(path).ok()
}

#[tokio::test]
async fn real_clip_is_probed_and_thumbnailed() {
    let Some(app) = TestApp::spawn_with_ffmpeg().await else {
        return;
    };
    let scratch = tempfile::tempdir().unwrap();
    let Some(bytes) = render_clip(scratch.path()) else {
        return;
    };
    let token = app.create_uploader("alice").await;

    let res = app.upload_with_token("pattern.mp4", bytes, &token).await;
    assert_eq!(res.status, 201, "upload failed: {}", res.text);
    let item = &res.body["samples"][0];
    let id = item["id"].as_i64().unwrap() as i32;
    let thumbnail = item["thumbnail"].as_str().unwrap();
    assert!(app.thumbnails_dir().join(thumbnail).exists());

    let meta = app.get_without_token(&routes::sample_metadata(id)).await;
    assert_eq!(meta.status, 200);
    assert_eq!(meta.body["codec"], "h264");
    assert_eq!(meta.body["width"], 320);
    assert_eq!(meta.body["height"], 240);
    assert_eq!(meta.body["aspect_ratio"], "4:3");
}
