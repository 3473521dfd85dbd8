//! Archive download integration tests.
//!
//! Run with: `cargo test -p warcvault-api --test download_test`

mod helpers;

use helpers::{setup_test_app, setup_test_app_with, WARC_BODY};

fn header<'a>(response: &'a axum_test::TestResponse, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[tokio::test]
async fn test_collection_download_declares_exact_length() {
    let app = setup_test_app().await;
    app.committed_recording("alice", "coll1", "session1", "rec-001.warc")
        .await;

    let response = app
        .client()
        .get("/api/v1/collections/alice/coll1/download")
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(header(&response, "content-type"), Some("application/octet-stream"));

    let disposition = header(&response, "content-disposition").unwrap();
    assert!(disposition.starts_with("attachment; filename*=UTF-8''coll1-"));
    assert!(disposition.ends_with(".warc.gz"));

    let body = response.as_bytes();
    let length: usize = header(&response, "content-length").unwrap().parse().unwrap();
    assert_eq!(length, body.len());

    // Collection warcinfo first, as a gzip member.
    assert_eq!(&body[..2], &[0x1f, 0x8b]);
    assert!(contains(body, WARC_BODY));
}

#[tokio::test]
async fn test_chunked_download_has_no_length() {
    let app = setup_test_app_with(|mut config| {
        config.download_chunk_encoded = true;
        config
    })
    .await;
    app.committed_recording("alice", "coll1", "session1", "rec-001.warc")
        .await;

    let response = app
        .client()
        .get("/api/v1/collections/alice/coll1/download")
        .await;

    assert_eq!(response.status_code(), 200);
    assert!(header(&response, "content-length").is_none());
    assert!(contains(response.as_bytes(), WARC_BODY));
}

#[tokio::test]
async fn test_recording_subset_download_name() {
    let app = setup_test_app().await;
    app.committed_recording("alice", "coll1", "session1", "rec-001.warc")
        .await;
    app.committed_recording("alice", "coll1", "session2", "rec-002.warc")
        .await;

    let single = app
        .client()
        .get("/api/v1/collections/alice/coll1/recordings/session1/download")
        .await;
    assert_eq!(single.status_code(), 200);
    assert!(header(&single, "content-disposition")
        .unwrap()
        .starts_with("attachment; filename*=UTF-8''session1-"));

    let both = app
        .client()
        .get("/api/v1/collections/alice/coll1/recordings/session1,session2/download")
        .await;
    assert_eq!(both.status_code(), 200);
    assert!(header(&both, "content-disposition")
        .unwrap()
        .starts_with("attachment; filename*=UTF-8''coll1-session1%2Csession2-"));
}

#[tokio::test]
async fn test_missing_collection_is_404() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get("/api/v1/collections/alice/nope/download")
        .await;

    assert_eq!(response.status_code(), 404);
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "NOT_FOUND");
    assert_eq!(data["error"], "no_such_collection");
}

#[tokio::test]
async fn test_missing_file_is_skipped() {
    let app = setup_test_app().await;
    app.committed_recording("alice", "coll1", "session1", "rec-001.warc")
        .await;
    std::fs::remove_file(app.record_root().join("alice").join("rec-001.warc")).unwrap();

    let response = app
        .client()
        .get("/api/v1/collections/alice/coll1/download")
        .await;

    assert_eq!(response.status_code(), 200);
    let length: usize = header(&response, "content-length").unwrap().parse().unwrap();
    assert_eq!(length, response.as_bytes().len());
    assert!(!contains(response.as_bytes(), WARC_BODY));
}

#[tokio::test]
async fn test_download_counts() {
    let app = setup_test_app().await;

    for _ in 0..2 {
        app.client()
            .get("/api/v1/collections/alice/coll1/download")
            .await;
    }

    let collection = app.collections.get("alice", "coll1").await.unwrap().unwrap();
    assert_eq!(collection.info.get("download_count").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn test_health() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), 200);
    let data: serde_json::Value = response.json();
    assert_eq!(data["status"], "healthy");
}
