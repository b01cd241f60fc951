use std::sync::atomic::Ordering;

use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

use sampledb::entity::{metadata, sample};

use crate::common::{PNG_BYTES, TestApp, m4v_bytes, mp4_bytes, routes};

async fn sample_rows(app: &TestApp) -> u64 {
    sample::Entity::find().count(&app.db).await.unwrap()
}

mod accepted_uploads {
    use super::*;

    #[tokio::test]
    async fn valid_mp4_is_stored_with_metadata_and_thumbnail() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .upload_with_token("My cool clip.mp4", mp4_bytes(2048), &token)
            .await;

        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        let item = &res.body["samples"][0];
        assert_eq!(item["filename"], "My_cool_clip.mp4");
        assert_eq!(item["force_reencode"], false);

        let stored_as = item["stored_as"].as_str().unwrap();
        assert!(stored_as.starts_with("My_cool_clip_"));
        assert!(stored_as.ends_with(".mp4"));
        assert!(app.samples_dir().join(stored_as).exists());

        let thumbnail = item["thumbnail"].as_str().unwrap();
        assert!(app.thumbnails_dir().join(thumbnail).exists());

        let id = item["id"].as_i64().unwrap() as i32;
        let meta = metadata::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .expect("metadata row should exist");
        assert_eq!(meta.filesize, 2048);
        assert_eq!(meta.codec, "h264");
    }

    #[tokio::test]
    async fn uploads_by_regular_users_wait_for_review() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app.upload_with_token("clip.mp4", mp4_bytes(512), &token).await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["samples"][0]["is_public"], false);
    }

    #[tokio::test]
    async fn uploads_by_uploaders_are_public_immediately() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;

        let res = app.upload_with_token("clip.mp4", mp4_bytes(512), &token).await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["samples"][0]["is_public"], true);
    }

    #[tokio::test]
    async fn several_files_in_one_request_become_separate_samples() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;

        let res = app
            .upload_files(
                vec![
                    ("one.mp4", mp4_bytes(256)),
                    ("two.mp4", mp4_bytes(256)),
                    ("one.mp4", mp4_bytes(256)),
                ],
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        let samples = res.body["samples"].as_array().unwrap();
        assert_eq!(samples.len(), 3);
        assert_ne!(samples[0]["stored_as"], samples[2]["stored_as"]);
        assert_eq!(sample_rows(&app).await, 3);
        assert_eq!(TestApp::file_count(app.samples_dir()), 3);
    }

    #[tokio::test]
    async fn failed_thumbnail_still_stores_the_sample() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        app.fake().fail_thumbnail.store(true, Ordering::SeqCst);

        let res = app.upload_with_token("clip.mp4", mp4_bytes(512), &token).await;

        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        assert_eq!(sample_rows(&app).await, 1);
        let stored_as = res.body["samples"][0]["stored_as"].as_str().unwrap();
        assert!(app.samples_dir().join(stored_as).exists());
        assert_eq!(TestApp::file_count(app.thumbnails_dir()), 0);
    }

    #[tokio::test]
    async fn m4v_content_is_accepted_with_a_forced_reencode() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;

        let res = app.upload_with_token("clip.m4v", m4v_bytes(), &token).await;
        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        assert_eq!(res.body["samples"][0]["force_reencode"], true);
        let id = res.body["samples"][0]["id"].as_i64().unwrap() as i32;

        let edit = app
            .patch_with_token(&routes::sample(id), &json!({"filename": "clip"}), &token)
            .await;

        assert_eq!(edit.status, 200, "edit failed: {}", edit.text);
        assert_eq!(app.reencode_count(), 1);
    }
}

mod rejected_uploads {
    use super::*;

    #[tokio::test]
    async fn oversized_file_leaves_no_row_and_no_file() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;

        // 1 MB limit in the test config.
        let res = app
            .upload_with_token("big.mp4", mp4_bytes(1_000_001), &token)
            .await;

        assert_eq!(res.status, 413);
        assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(sample_rows(&app).await, 0);
        assert_eq!(TestApp::file_count(app.samples_dir()), 0);
        assert_eq!(TestApp::file_count(app.thumbnails_dir()), 0);
    }

    #[tokio::test]
    async fn file_at_the_limit_is_accepted() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;

        let res = app
            .upload_with_token("edge.mp4", mp4_bytes(1_000_000), &token)
            .await;

        assert_eq!(res.status, 201, "upload failed: {}", res.text);
    }

    #[tokio::test]
    async fn one_oversized_file_rejects_the_whole_request() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;

        let res = app
            .upload_files(
                vec![
                    ("small.mp4", mp4_bytes(256)),
                    ("big.mp4", mp4_bytes(1_200_000)),
                ],
                &token,
            )
            .await;

        assert_eq!(res.status, 413);
        assert_eq!(sample_rows(&app).await, 0);
        assert_eq!(TestApp::file_count(app.samples_dir()), 0);
    }

    #[tokio::test]
    async fn content_outside_the_allow_list_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;

        let res = app
            .upload_with_token("sneaky.mp4", PNG_BYTES.to_vec(), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(sample_rows(&app).await, 0);
        assert_eq!(TestApp::file_count(app.samples_dir()), 0);
    }

    #[tokio::test]
    async fn one_invalid_file_rejects_all_files_of_the_request() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;

        let res = app
            .upload_files(
                vec![
                    ("good.mp4", mp4_bytes(256)),
                    ("bad.mp4", b"plain text".to_vec()),
                ],
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(sample_rows(&app).await, 0);
        assert_eq!(TestApp::file_count(app.samples_dir()), 0);
    }

    #[tokio::test]
    async fn unplayable_media_is_rejected_and_removed() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        app.fake().fail_probe.store(true, Ordering::SeqCst);

        let res = app.upload_with_token("broken.mp4", mp4_bytes(512), &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(res.body["message"].as_str().unwrap().contains("valid .mp4 file"));
        assert_eq!(sample_rows(&app).await, 0);
        assert_eq!(TestApp::file_count(app.samples_dir()), 0);
        assert_eq!(TestApp::file_count(app.thumbnails_dir()), 0);
    }

    #[tokio::test]
    async fn too_many_files_are_rejected() {
        let app = TestApp::spawn_with(|c| c.upload.max_files = 2).await;
        let token = app.create_uploader("alice").await;

        let res = app
            .upload_files(
                vec![
                    ("a.mp4", mp4_bytes(64)),
                    ("b.mp4", mp4_bytes(64)),
                    ("c.mp4", mp4_bytes(64)),
                ],
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(TestApp::file_count(app.samples_dir()), 0);
    }

    #[tokio::test]
    async fn filename_that_is_too_long_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let name = format!("{}.mp4", "a".repeat(100));

        let res = app.upload_with_token(&name, mp4_bytes(64), &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Filename must not exceed 100 bytes");
    }

    #[tokio::test]
    async fn request_without_file_fields_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;

        let res = app.upload_files(vec![], &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn anonymous_upload_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_with_token("clip.mp4", mp4_bytes(64), "not-a-token")
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(sample_rows(&app).await, 0);
    }
}

mod metadata_endpoint {
    use super::*;

    #[tokio::test]
    async fn metadata_reports_the_probed_stream() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;

        let res = app.get_without_token(&routes::sample_metadata(id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["width"], 1280);
        assert_eq!(res.body["height"], 720);
        assert_eq!(res.body["framerate"], 30.0);
        assert_eq!(res.body["aspect_ratio"], "16:9");
        assert_eq!(res.body["codec"], "h264");
    }

    #[tokio::test]
    async fn missing_metadata_is_recomputed_on_request() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;

        metadata::Entity::delete_by_id(id)
            .exec(&app.db)
            .await
            .unwrap();

        let res = app.get_without_token(&routes::sample_metadata(id)).await;

        assert_eq!(res.status, 200, "metadata failed: {}", res.text);
        assert_eq!(res.body["filesize"], 1024);
        assert!(
            metadata::Entity::find_by_id(id)
                .one(&app.db)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn missing_file_and_metadata_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;

        metadata::Entity::delete_by_id(id)
            .exec(&app.db)
            .await
            .unwrap();
        for entry in std::fs::read_dir(app.samples_dir()).unwrap() {
            std::fs::remove_file(entry.unwrap().path()).unwrap();
        }

        let res = app.get_without_token(&routes::sample_metadata(id)).await;

        assert_eq!(res.status, 404);
    }
}
