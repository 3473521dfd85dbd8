//! Committed-file catalog integration tests.
//!
//! Run with: `cargo test -p warcvault-api --test webdata_test`

mod helpers;

use helpers::{setup_test_app, WARC_BODY};

#[tokio::test]
async fn test_list_committed_files() {
    let app = setup_test_app().await;
    app.committed_recording("alice", "coll1", "session1", "rec-001.warc")
        .await;

    let response = app
        .client()
        .get("/api/v1/download/webdata")
        .add_query_param("user", "alice")
        .add_query_param("coll_name", "coll1")
        .await;

    assert_eq!(response.status_code(), 200);
    let data: serde_json::Value = response.json();
    assert_eq!(data["include-extra"], true);

    let files = data["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["filename"], "rec-001.warc");
    assert_eq!(files[0]["rec_id"], "session1");
    assert_eq!(files[0]["coll_name"], "coll1");
    assert_eq!(files[0]["content-type"], "application/warc");
    assert!(files[0]["checksum"].as_str().unwrap().starts_with("sha256:"));
    assert_eq!(
        files[0]["locations"][0],
        "http://archive.test/api/v1/download/alice/coll1/rec-001.warc"
    );
}

#[tokio::test]
async fn test_open_recording_is_not_listed() {
    let app = setup_test_app().await;
    let rec = app
        .committed_recording("alice", "coll1", "session1", "rec-001.warc")
        .await;
    app.recordings.set_open(&rec, true).await.unwrap();

    let response = app
        .client()
        .get("/api/v1/download/webdata")
        .add_query_param("user", "alice")
        .await;

    assert_eq!(response.status_code(), 200);
    let data: serde_json::Value = response.json();
    assert!(data["files"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_unknown_user() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get("/api/v1/download/webdata")
        .add_query_param("user", "bob")
        .await;

    assert_eq!(response.status_code(), 404);
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "no_such_user");
}

#[tokio::test]
async fn test_list_without_user_is_not_found() {
    let app = setup_test_app().await;

    for path in ["/api/v1/download/webdata", "/api/v1/download/webdata?user="] {
        let response = app.client().get(path).await;
        assert_eq!(response.status_code(), 404);
        let data: serde_json::Value = response.json();
        assert_eq!(data["error"], "no_such_user");
    }
}

#[tokio::test]
async fn test_download_single_file() {
    let app = setup_test_app().await;
    app.committed_recording("alice", "coll1", "session1", "rec-001.warc")
        .await;

    let response = app
        .client()
        .get("/api/v1/download/alice/coll1/rec-001.warc")
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename*=UTF-8''rec-001.warc"
    );
    assert_eq!(response.as_bytes().as_ref(), WARC_BODY);
}

#[tokio::test]
async fn test_download_unknown_file() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get("/api/v1/download/alice/coll1/nope.warc")
        .await;

    assert_eq!(response.status_code(), 404);
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "file_not_found");
}

#[tokio::test]
async fn test_download_unloadable_file() {
    let app = setup_test_app().await;
    app.committed_recording("alice", "coll1", "session1", "rec-001.warc")
        .await;
    std::fs::remove_file(app.record_root().join("alice").join("rec-001.warc")).unwrap();

    let response = app
        .client()
        .get("/api/v1/download/alice/coll1/rec-001.warc")
        .await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "file_load_error");
}
