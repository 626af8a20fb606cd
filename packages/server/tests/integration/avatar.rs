use crate::common::{TestApp, routes};

fn image(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31) ^ seed).collect()
}

mod avatar_upload {
    use super::*;

    #[tokio::test]
    async fn upload_then_preview_returns_same_bytes() {
        let app = TestApp::spawn().await;
        let data = image(2048, 7);

        let res = app
            .upload_avatar(1, "face.png", "image/png", data.clone())
            .await;
        assert_eq!(res.status, 200);
        assert!(res.bytes.is_empty());

        let preview = app.get(&routes::avatar_preview(1)).await;
        assert_eq!(preview.status, 200);
        assert_eq!(preview.content_type.as_deref(), Some("image/png"));
        assert_eq!(preview.bytes, data);
    }

    #[tokio::test]
    async fn avatar_field_name_is_accepted() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_field(2, "avatar", "face.jpg", "image/jpeg", b"jpeg".to_vec())
            .await;
        assert_eq!(res.status, 200);

        let preview = app.get(&routes::avatar_preview(2)).await;
        assert_eq!(preview.bytes, b"jpeg");
        assert_eq!(app.avatar_files(), vec!["avatar_2.jpg"]);
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_field(1, "picture", "face.png", "image/png", b"png".to_vec())
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
        assert!(app.records.is_empty().await);
    }

    #[tokio::test]
    async fn reupload_overwrites_previous_avatar() {
        let app = TestApp::spawn().await;
        app.store_avatar(4, "a.png", &image(100, 1)).await;
        let second = image(300, 2);
        app.store_avatar(4, "b.png", &second).await;

        assert_eq!(app.get(&routes::avatar_preview(4)).await.bytes, second);
        assert_eq!(app.get(&routes::avatar(4)).await.bytes, second);
        assert_eq!(app.records.len().await, 1);
        assert_eq!(app.avatar_files(), vec!["avatar_4.png"]);
    }

    #[tokio::test]
    async fn extension_change_leaves_one_file() {
        let app = TestApp::spawn().await;
        app.store_avatar(5, "face.png", b"png").await;
        app.store_avatar(5, "face.JPG", b"jpg").await;

        assert_eq!(app.avatar_files(), vec!["avatar_5.jpg"]);
        assert_eq!(app.get(&routes::avatar(5)).await.bytes, b"jpg");
    }

    #[tokio::test]
    async fn file_name_without_extension_is_stored_as_bin() {
        let app = TestApp::spawn().await;
        app.store_avatar(3, "portrait", b"raw").await;

        assert_eq!(app.avatar_files(), vec!["avatar_3.bin"]);
    }

    #[tokio::test]
    async fn size_limit_is_inclusive() {
        let app = TestApp::spawn_with_limit(1024).await;

        let at_limit = app
            .upload_avatar(1, "face.png", "image/png", image(1024, 3))
            .await;
        assert_eq!(at_limit.status, 200);

        let over_limit = app
            .upload_avatar(2, "face.png", "image/png", image(1025, 3))
            .await;
        assert_eq!(over_limit.status, 413);
        assert_eq!(over_limit.code(), "PAYLOAD_TOO_LARGE");
        assert_eq!(app.get(&routes::avatar_preview(2)).await.status, 404);
        assert_eq!(app.avatar_files(), vec!["avatar_1.png"]);
    }

    #[tokio::test]
    async fn oversized_reupload_keeps_previous_avatar() {
        let app = TestApp::spawn_with_limit(1024).await;
        let original = image(512, 9);
        app.store_avatar(6, "face.png", &original).await;

        let res = app
            .upload_avatar(6, "face.png", "image/png", image(4096, 9))
            .await;
        assert_eq!(res.status, 413);

        assert_eq!(app.get(&routes::avatar_preview(6)).await.bytes, original);
        assert_eq!(app.get(&routes::avatar(6)).await.bytes, original);
    }

    #[tokio::test]
    async fn unknown_student_has_no_side_effects() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_avatar(999, "face.png", "image/png", b"png".to_vec())
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
        assert!(app.avatar_files().is_empty());
        assert!(app.records.is_empty().await);
    }

    #[tokio::test]
    async fn student_added_later_can_upload() {
        let app = TestApp::spawn().await;
        app.students.insert(42).await;

        app.store_avatar(42, "face.png", b"hello").await;
        assert_eq!(app.get(&routes::avatar_preview(42)).await.bytes, b"hello");
    }

    #[tokio::test]
    async fn removed_student_cannot_upload() {
        let app = TestApp::spawn().await;
        app.students.remove(3).await;

        let res = app
            .upload_avatar(3, "face.png", "image/png", b"png".to_vec())
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn failed_record_write_is_internal_error() {
        let app = TestApp::spawn().await;
        app.records.fail_upserts(true);

        let res = app
            .upload_avatar(1, "face.png", "image/png", b"png".to_vec())
            .await;
        assert_eq!(res.status, 500);
        assert_eq!(res.code(), "INTERNAL_ERROR");
        assert_eq!(app.get(&routes::avatar_preview(1)).await.status, 404);
    }
}

mod avatar_download {
    use super::*;

    #[tokio::test]
    async fn full_download_has_content_length() {
        let app = TestApp::spawn().await;
        let data = image(200 * 1024, 5);
        app.store_avatar(7, "big.png", &data).await;

        let res = app.get(&routes::avatar(7)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.content_type.as_deref(), Some("image/png"));
        assert_eq!(res.content_length, Some(data.len() as u64));
        assert_eq!(res.bytes, data);
    }

    #[tokio::test]
    async fn no_avatar_is_not_found() {
        let app = TestApp::spawn().await;

        let preview = app.get(&routes::avatar_preview(8)).await;
        assert_eq!(preview.status, 404);
        assert_eq!(preview.code(), "NOT_FOUND");

        let full = app.get(&routes::avatar(8)).await;
        assert_eq!(full.status, 404);
        assert_eq!(full.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn missing_file_fails_download_but_not_preview() {
        let app = TestApp::spawn().await;
        app.store_avatar(9, "face.png", b"still cached").await;
        std::fs::remove_file(app.avatars_dir.join("avatar_9.png")).unwrap();

        let full = app.get(&routes::avatar(9)).await;
        assert_eq!(full.status, 500);
        assert_eq!(full.code(), "INTERNAL_ERROR");

        let preview = app.get(&routes::avatar_preview(9)).await;
        assert_eq!(preview.status, 200);
        assert_eq!(preview.bytes, b"still cached");
    }

    #[tokio::test]
    async fn resized_file_fails_download() {
        let app = TestApp::spawn().await;
        app.store_avatar(10, "face.png", b"original").await;
        std::fs::write(app.avatars_dir.join("avatar_10.png"), b"replaced out of band").unwrap();

        let full = app.get(&routes::avatar(10)).await;
        assert_eq!(full.status, 500);
    }
}

mod avatar_list {
    use super::*;

    #[tokio::test]
    async fn empty_list() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::AVATARS).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 0);
        assert_eq!(res.body["pagination"]["total"].as_u64().unwrap(), 0);
        assert_eq!(res.body["pagination"]["page"].as_u64().unwrap(), 0);
        assert_eq!(res.body["pagination"]["size"].as_u64().unwrap(), 10);
    }

    #[tokio::test]
    async fn pages_follow_upload_order_without_blobs() {
        let app = TestApp::spawn().await;
        for student_id in [3, 1, 2] {
            app.store_avatar(student_id, "face.png", &image(64, student_id as u8))
                .await;
        }

        let first = app.get(&routes::avatars_page(0, 2)).await;
        assert_eq!(first.status, 200);
        let data = first.body["data"].as_array().unwrap();
        let students: Vec<i64> = data
            .iter()
            .map(|a| a["student_id"].as_i64().unwrap())
            .collect();
        assert_eq!(students, vec![3, 1]);
        assert_eq!(data[0]["file_size"].as_i64().unwrap(), 64);
        assert_eq!(data[0]["media_type"].as_str().unwrap(), "image/png");
        assert!(
            data[0]["file_path"]
                .as_str()
                .unwrap()
                .ends_with("avatar_3.png")
        );
        assert!(data[0].get("cached_blob").is_none());
        assert_eq!(first.body["pagination"]["total"].as_u64().unwrap(), 3);
        assert_eq!(first.body["pagination"]["total_pages"].as_u64().unwrap(), 2);

        let second = app.get(&routes::avatars_page(1, 2)).await;
        let data = second.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["student_id"].as_i64().unwrap(), 2);
    }

    #[tokio::test]
    async fn reupload_keeps_list_position() {
        let app = TestApp::spawn().await;
        app.store_avatar(1, "a.png", b"one").await;
        app.store_avatar(2, "a.png", b"two").await;
        app.store_avatar(1, "a.png", b"one again").await;

        let res = app.get(routes::AVATARS).await;
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["student_id"].as_i64().unwrap(), 1);
        assert_eq!(data[0]["file_size"].as_i64().unwrap(), 9);
    }
}
