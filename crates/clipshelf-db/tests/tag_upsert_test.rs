//! Integration tests for tag persistence: lowercasing at the store
//! boundary, upsert-by-name sharing, and association ordering.

use clipshelf_db::test_fixtures::{TestDataBuilder, TestDatabase};
use clipshelf_db::{CreateVideoRequest, TagRepository, VideoRepository};

#[tokio::test]
async fn test_tags_are_lowercased_at_persistence() {
    let test_db = TestDatabase::new().await;

    let video = test_db
        .db
        .videos
        .create(CreateVideoRequest {
            title: "T".to_string(),
            thumbnail_url: "https://x.test/y.jpg".to_string(),
            duration_seconds: 60,
            views: 10,
            tags: vec!["Tutorial".to_string()],
        })
        .await
        .unwrap();

    assert_eq!(video.tags, ["tutorial"]);

    let tags = test_db.db.tags.list().await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "tutorial");

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_overlapping_tags_share_one_row() {
    let test_db = TestDatabase::new().await;

    TestDataBuilder::new(&test_db.db)
        .with_video("First", &["x"])
        .await
        .with_video("Second", &["X", "y"])
        .await
        .build();

    let tags = test_db.db.tags.list().await.unwrap();
    let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["x", "y"]);

    let x = tags.iter().find(|t| t.name == "x").unwrap();
    assert_eq!(x.video_count, 2);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_duplicate_raw_tags_collapse_on_create() {
    let test_db = TestDatabase::new().await;

    let video = test_db
        .db
        .videos
        .create(CreateVideoRequest {
            title: "Dup".to_string(),
            thumbnail_url: "https://x.test/y.jpg".to_string(),
            duration_seconds: 60,
            views: 0,
            tags: vec![
                "rust".to_string(),
                " Rust ".to_string(),
                "RUST".to_string(),
            ],
        })
        .await
        .unwrap();

    assert_eq!(video.tags, ["rust"]);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_returned_video_is_fully_shaped() {
    let test_db = TestDatabase::new().await;

    let video = test_db
        .db
        .videos
        .create(CreateVideoRequest {
            title: "Shaped".to_string(),
            thumbnail_url: "https://x.test/y.jpg".to_string(),
            duration_seconds: 90,
            views: 3,
            tags: vec!["b".to_string(), "a".to_string()],
        })
        .await
        .unwrap();

    // Identity and timestamps are store-assigned.
    assert!(!video.id.is_nil());
    assert_eq!(video.created_at_utc, video.updated_at_utc);
    assert_eq!(video.duration_seconds, 90);
    assert_eq!(video.views, 3);
    // Tags come back in association (insertion) order, not sorted.
    assert_eq!(video.tags, ["b", "a"]);

    let fetched = test_db.db.videos.fetch(video.id).await.unwrap();
    assert_eq!(fetched.tags, ["b", "a"]);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_get_for_video_follows_association_order() {
    let test_db = TestDatabase::new().await;

    let video = test_db
        .db
        .videos
        .create(CreateVideoRequest {
            title: "Ordered".to_string(),
            thumbnail_url: "https://x.test/y.jpg".to_string(),
            duration_seconds: 60,
            views: 0,
            tags: vec!["zeta".to_string(), "alpha".to_string(), "mid".to_string()],
        })
        .await
        .unwrap();

    let names = test_db.db.tags.get_for_video(video.id).await.unwrap();
    assert_eq!(names, ["zeta", "alpha", "mid"]);

    test_db.cleanup().await;
}
