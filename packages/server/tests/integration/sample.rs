use std::sync::atomic::Ordering;

use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

use sampledb::entity::{sample, sample_like};

use crate::common::{PNG_BYTES, TestApp, mp4_bytes, routes};

mod listing {
    use super::*;

    #[tokio::test]
    async fn pages_start_at_the_expected_offset() {
        let app = TestApp::spawn_with(|c| c.listing.samples_per_page = 2).await;
        let token = app.create_uploader("alice").await;
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(app.upload_sample(&token, &format!("clip{i}.mp4")).await);
        }

        let page1 = app
            .get_without_token(&format!("{}?sort=oldest&page=1", routes::SAMPLES))
            .await;
        let page3 = app
            .get_without_token(&format!("{}?sort=oldest&page=3", routes::SAMPLES))
            .await;

        assert_eq!(page1.status, 200);
        assert_eq!(page1.data_ids(), ids[0..2].to_vec());
        assert_eq!(page3.data_ids(), vec![ids[4]]);
        assert_eq!(page1.body["pagination"]["total"], 5);
        assert_eq!(page1.body["pagination"]["total_pages"], 3);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty_and_page_zero_is_rejected() {
        let app = TestApp::spawn_with(|c| c.listing.samples_per_page = 2).await;
        let token = app.create_uploader("alice").await;
        app.upload_sample(&token, "clip.mp4").await;

        let past = app
            .get_without_token(&format!("{}?page=9", routes::SAMPLES))
            .await;
        let zero = app
            .get_without_token(&format!("{}?page=0", routes::SAMPLES))
            .await;

        assert_eq!(past.status, 200);
        assert!(past.data_ids().is_empty());
        assert_eq!(zero.status, 400);
        assert_eq!(zero.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn page_beyond_the_offset_range_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token(&format!("{}?page={}", routes::SAMPLES, u64::MAX))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(res.body["message"], "Page out of range");
    }

    #[tokio::test]
    async fn page_count_endpoint_rounds_up() {
        let app = TestApp::spawn_with(|c| c.listing.samples_per_page = 2).await;
        let token = app.create_uploader("alice").await;
        for i in 0..3 {
            app.upload_sample(&token, &format!("clip{i}.mp4")).await;
        }

        let res = app.get_without_token(routes::SAMPLE_PAGES).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["pages"], 2);
        assert_eq!(res.body["total"], 3);
        assert_eq!(res.body["per_page"], 2);
    }

    #[tokio::test]
    async fn latest_and_oldest_orders_are_reversed() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let first = app.upload_sample(&token, "first.mp4").await;
        let second = app.upload_sample(&token, "second.mp4").await;

        let latest = app
            .get_without_token(&format!("{}?sort=latest", routes::SAMPLES))
            .await;
        let oldest = app
            .get_without_token(&format!("{}?sort=oldest", routes::SAMPLES))
            .await;

        assert_eq!(latest.data_ids(), vec![second, first]);
        assert_eq!(oldest.data_ids(), vec![first, second]);
    }

    #[tokio::test]
    async fn default_order_is_most_liked_with_ties_by_id() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let a = app.upload_sample(&token, "a.mp4").await;
        let b = app.upload_sample(&token, "b.mp4").await;
        let c = app.upload_sample(&token, "c.mp4").await;
        let d = app.upload_sample(&token, "d.mp4").await;

        let bob = app.create_authenticated_user("bob", "securepass").await;
        let carol = app.create_authenticated_user("carol", "securepass").await;
        for (id, voter) in [(c, &bob), (c, &carol), (b, &bob)] {
            let res = app
                .post_with_token(&routes::sample_like(id), &json!({}), voter)
                .await;
            assert_eq!(res.status, 200, "like failed: {}", res.text);
        }

        let res = app.get_without_token(routes::SAMPLES).await;

        assert_eq!(res.data_ids(), vec![c, b, a, d]);
        assert_eq!(res.body["data"][0]["likes"], 2);
    }

    #[tokio::test]
    async fn private_samples_are_not_listed() {
        let app = TestApp::spawn().await;
        let uploader = app.create_uploader("alice").await;
        let public = app.upload_sample(&uploader, "public.mp4").await;
        let regular = app.create_authenticated_user("bob", "securepass").await;
        app.upload_sample(&regular, "private.mp4").await;

        let res = app.get_without_token(routes::SAMPLES).await;
        let recent = app.get_without_token(routes::RECENT).await;

        assert_eq!(res.data_ids(), vec![public]);
        assert_eq!(recent.data_ids(), vec![public]);
    }

    #[tokio::test]
    async fn recent_and_top_hold_at_most_eight_samples() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        for i in 0..10 {
            app.upload_sample(&token, &format!("clip{i}.mp4")).await;
        }

        let recent = app.get_without_token(routes::RECENT).await;
        let top = app.get_without_token(routes::TOP).await;

        assert_eq!(recent.data_ids().len(), 8);
        assert_eq!(top.data_ids().len(), 8);
    }
}

mod search {
    use super::*;

    #[tokio::test]
    async fn search_matches_substrings_ignoring_case() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let kick = app.upload_sample(&token, "Kick_Drum.mp4").await;
        app.upload_sample(&token, "snare.mp4").await;

        let res = app
            .get_without_token(&format!("{}?q=kick", routes::SEARCH))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.data_ids(), vec![kick]);
    }

    #[tokio::test]
    async fn wildcards_in_the_query_are_literal() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        app.upload_sample(&token, "snare.mp4").await;

        let res = app
            .get_without_token(&format!("{}?q=%25", routes::SEARCH))
            .await;

        assert!(res.data_ids().is_empty());
    }

    #[tokio::test]
    async fn empty_query_returns_nothing() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        app.upload_sample(&token, "snare.mp4").await;

        let res = app.get_without_token(routes::SEARCH).await;

        assert_eq!(res.status, 200);
        assert!(res.data_ids().is_empty());
    }
}

mod visibility {
    use super::*;

    #[tokio::test]
    async fn private_sample_is_hidden_from_anonymous_and_other_users() {
        let app = TestApp::spawn().await;
        let owner = app.create_authenticated_user("alice", "securepass").await;
        let other = app.create_authenticated_user("bob", "securepass").await;
        let id = app.upload_sample(&owner, "secret.mp4").await;

        assert_eq!(app.get_without_token(&routes::sample(id)).await.status, 404);
        assert_eq!(app.get_with_token(&routes::sample(id), &other).await.status, 404);
        assert_eq!(app.get_raw(&routes::sample_download(id)).await.status(), 404);
        assert_eq!(app.get_raw(&routes::sample_thumbnail(id)).await.status(), 404);
    }

    #[tokio::test]
    async fn private_sample_is_visible_to_owner_and_admin() {
        let app = TestApp::spawn().await;
        let owner = app.create_authenticated_user("alice", "securepass").await;
        let admin = app.create_admin("root").await;
        let id = app.upload_sample(&owner, "secret.mp4").await;

        let as_owner = app.get_with_token(&routes::sample(id), &owner).await;
        let as_admin = app.get_with_token(&routes::sample(id), &admin).await;

        assert_eq!(as_owner.status, 200);
        assert_eq!(as_owner.body["is_public"], false);
        assert_eq!(as_admin.status, 200);
    }

    #[tokio::test]
    async fn detail_includes_uploader_metadata_and_like_state() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;
        app.post_with_token(&routes::sample_like(id), &json!({}), &token)
            .await;

        let res = app.get_with_token(&routes::sample(id), &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["uploader"], "alice");
        assert_eq!(res.body["likes"], 1);
        assert_eq!(res.body["liked"], true);
        assert_eq!(res.body["metadata"]["codec"], "h264");
        assert!(res.body["source"].is_null());
    }

    #[tokio::test]
    async fn unknown_sample_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::sample(9999)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod likes {
    use super::*;

    #[tokio::test]
    async fn like_then_unlike_restores_the_count() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;

        let liked = app
            .post_with_token(&routes::sample_like(id), &json!({}), &token)
            .await;
        assert_eq!(liked.status, 200);
        assert_eq!(liked.body["likes"], 1);
        assert_eq!(liked.body["liked"], true);

        let unliked = app
            .post_with_token(&routes::sample_like(id), &json!({}), &token)
            .await;
        assert_eq!(unliked.body["likes"], 0);
        assert_eq!(unliked.body["liked"], false);
    }

    #[tokio::test]
    async fn unverified_account_cannot_like() {
        let app = TestApp::spawn_with(|c| c.auth.require_verification = true).await;
        let uploader = app.create_uploader("alice").await;
        let id = app.upload_sample(&uploader, "clip.mp4").await;

        let res = app
            .post_with_token(&routes::sample_like(id), &json!({}), &uploader)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "ACCOUNT_UNVERIFIED");
        assert_eq!(
            res.body["message"],
            "Please verify your account to like samples."
        );
    }

    #[tokio::test]
    async fn anonymous_like_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;

        let res = app
            .post_without_token(&routes::sample_like(id), &json!({}))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}

mod editing {
    use super::*;

    #[tokio::test]
    async fn edit_renames_tags_and_sets_source() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;
        let source = app.create_source(&token, "Super Mario 64").await;

        let res = app
            .patch_with_token(
                &routes::sample(id),
                &json!({
                    "filename": "kick drum!.mp4",
                    "source_id": source,
                    "tags": "drums  one_shot drums",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "edit failed: {}", res.text);
        assert_eq!(res.body["filename"], "kick_drum.mp4");
        assert_eq!(res.body["source_id"], source);
        assert_eq!(res.body["tags"], json!(["drums", "one_shot"]));
        assert_eq!(app.reencode_count(), 0);
    }

    #[tokio::test]
    async fn tag_edits_replace_the_previous_set() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;

        app.patch_with_token(&routes::sample(id), &json!({"tags": "drums"}), &token)
            .await;
        let res = app
            .patch_with_token(&routes::sample(id), &json!({"tags": "bass"}), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["tags"], json!(["bass"]));
    }

    #[tokio::test]
    async fn null_source_detaches_it() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;
        let source = app.create_source(&token, "Doom").await;

        app.patch_with_token(&routes::sample(id), &json!({"source_id": source}), &token)
            .await;
        let res = app
            .patch_with_token(&routes::sample(id), &json!({"source_id": null}), &token)
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["source_id"].is_null());
    }

    #[tokio::test]
    async fn reencode_is_only_honoured_on_the_first_edit() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;

        let first = app
            .patch_with_token(&routes::sample(id), &json!({"reencode": true}), &token)
            .await;
        let second = app
            .patch_with_token(&routes::sample(id), &json!({"reencode": true}), &token)
            .await;

        assert_eq!(first.status, 200);
        assert_eq!(second.status, 200);
        assert_eq!(app.reencode_count(), 1);
    }

    #[tokio::test]
    async fn failed_reencode_surfaces_and_consumes_the_pending_upload() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;
        app.fake().fail_reencode.store(true, Ordering::SeqCst);

        let failed = app
            .patch_with_token(&routes::sample(id), &json!({"reencode": true}), &token)
            .await;
        assert_eq!(failed.status, 500);
        assert_eq!(failed.body["code"], "INTERNAL_ERROR");
        assert!(!failed.text.contains("encoder error"));

        app.fake().fail_reencode.store(false, Ordering::SeqCst);
        let retry = app
            .patch_with_token(&routes::sample(id), &json!({"reencode": true}), &token)
            .await;
        assert_eq!(retry.status, 200);
        assert_eq!(app.reencode_count(), 1);
    }

    #[tokio::test]
    async fn pending_upload_expires_after_its_ttl() {
        let app = TestApp::spawn_with(|c| c.upload.pending_ttl_mins = 0).await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;

        let res = app
            .patch_with_token(&routes::sample(id), &json!({"reencode": true}), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(app.reencode_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_first_edits_reencode_once() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;
        let path = routes::sample(id);
        let body = json!({"reencode": true});

        let (a, b) = tokio::join!(
            app.patch_with_token(&path, &body, &token),
            app.patch_with_token(&path, &body, &token),
        );

        assert_eq!(a.status, 200);
        assert_eq!(b.status, 200);
        assert_eq!(app.reencode_count(), 1);
    }

    #[tokio::test]
    async fn unknown_source_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;

        let res = app
            .patch_with_token(&routes::sample(id), &json!({"source_id": 4242}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn other_users_cannot_edit_but_admins_can() {
        let app = TestApp::spawn().await;
        let owner = app.create_uploader("alice").await;
        let other = app.create_authenticated_user("bob", "securepass").await;
        let admin = app.create_admin("root").await;
        let id = app.upload_sample(&owner, "clip.mp4").await;

        let denied = app
            .patch_with_token(&routes::sample(id), &json!({"filename": "mine"}), &other)
            .await;
        let allowed = app
            .patch_with_token(&routes::sample(id), &json!({"filename": "approved"}), &admin)
            .await;

        assert_eq!(denied.status, 403);
        assert_eq!(denied.body["code"], "PERMISSION_DENIED");
        assert_eq!(allowed.status, 200);
        assert_eq!(allowed.body["filename"], "approved.mp4");
    }

    #[tokio::test]
    async fn batch_edit_applies_to_pending_uploads_once() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let source = app.create_source(&token, "Earthbound").await;
        let res = app
            .upload_files(
                vec![("a.mp4", mp4_bytes(64)), ("b.mp4", mp4_bytes(64))],
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        let ids: Vec<i32> = res.body["samples"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_i64().unwrap() as i32)
            .collect();

        let batch = app
            .patch_with_token(
                routes::BATCH,
                &json!({"ids": ids, "source_id": source}),
                &token,
            )
            .await;
        assert_eq!(batch.status, 200, "batch failed: {}", batch.text);
        assert_eq!(batch.data_ids(), ids);
        assert!(
            batch.body["data"]
                .as_array()
                .unwrap()
                .iter()
                .all(|s| s["source_id"] == source)
        );

        let again = app
            .patch_with_token(
                routes::BATCH,
                &json!({"ids": ids, "source_id": null}),
                &token,
            )
            .await;
        assert_eq!(again.status, 400);
    }

    #[tokio::test]
    async fn batch_edit_of_someone_elses_upload_is_rejected() {
        let app = TestApp::spawn().await;
        let owner = app.create_uploader("alice").await;
        let other = app.create_uploader("bob").await;
        let id = app.upload_sample(&owner, "clip.mp4").await;

        let res = app
            .patch_with_token(routes::BATCH, &json!({"ids": [id]}), &other)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn delete_removes_row_likes_and_files() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;
        app.post_with_token(&routes::sample_like(id), &json!({}), &token)
            .await;

        let res = app.delete_with_token(&routes::sample(id), &token).await;

        assert_eq!(res.status, 200, "delete failed: {}", res.text);
        assert_eq!(res.body["message"], "Sample deleted successfully.");
        assert_eq!(res.body["warnings"], json!([]));
        assert!(sample::Entity::find_by_id(id).one(&app.db).await.unwrap().is_none());
        assert_eq!(sample_like::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(TestApp::file_count(app.samples_dir()), 0);
        assert_eq!(TestApp::file_count(app.thumbnails_dir()), 0);
    }

    #[tokio::test]
    async fn delete_with_missing_files_still_removes_the_row() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;
        for dir in [app.samples_dir(), app.thumbnails_dir()] {
            for entry in std::fs::read_dir(dir).unwrap() {
                std::fs::remove_file(entry.unwrap().path()).unwrap();
            }
        }

        let res = app.delete_with_token(&routes::sample(id), &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["warnings"].as_array().unwrap().len(), 2);
        assert!(sample::Entity::find_by_id(id).one(&app.db).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn other_users_cannot_delete() {
        let app = TestApp::spawn().await;
        let owner = app.create_uploader("alice").await;
        let other = app.create_uploader("bob").await;
        let id = app.upload_sample(&owner, "clip.mp4").await;

        let res = app.delete_with_token(&routes::sample(id), &other).await;

        assert_eq!(res.status, 403);
        assert!(sample::Entity::find_by_id(id).one(&app.db).await.unwrap().is_some());
    }
}

mod files {
    use super::*;

    #[tokio::test]
    async fn download_streams_the_video_as_an_attachment() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;

        let res = app.get_raw(&routes::sample_download(id)).await;

        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["content-type"], "video/mp4");
        let disposition = res.headers()["content-disposition"].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("clip.mp4"));
        assert_eq!(res.bytes().await.unwrap().to_vec(), mp4_bytes(1024));
    }

    #[tokio::test]
    async fn download_uses_the_edited_display_name() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;
        app.patch_with_token(&routes::sample(id), &json!({"filename": "Bass Hit"}), &token)
            .await;

        let res = app.get_raw(&routes::sample_download(id)).await;

        let disposition = res.headers()["content-disposition"].to_str().unwrap().to_string();
        assert!(disposition.contains("Bass_Hit.mp4"));
    }

    #[tokio::test]
    async fn thumbnail_is_served_as_png() {
        let app = TestApp::spawn().await;
        let token = app.create_uploader("alice").await;
        let id = app.upload_sample(&token, "clip.mp4").await;

        let res = app.get_raw(&routes::sample_thumbnail(id)).await;

        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["content-type"], "image/png");
        assert_eq!(res.bytes().await.unwrap().to_vec(), PNG_BYTES.to_vec());
    }
}
