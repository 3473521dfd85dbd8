//! Test helpers: in-memory fast store, a temp record root and the router.

use std::path::PathBuf;
use std::sync::Arc;

use axum_test::TestServer;
use tempfile::TempDir;
use warcvault_api::setup::routes;
use warcvault_api::AppState;
use warcvault_core::models::{FileLocation, RecordingRef};
use warcvault_core::{Config, KeyTemplates};
use warcvault_db::{CollectionRepository, KvStore, MemoryStore, RecordingRepository};
use warcvault_services::StorageRegistry;

pub const WARC_BODY: &[u8] = b"WARC/1.0\r\nWARC-Type: response\r\nContent-Length: 0\r\n\r\n\r\n\r\n";

pub struct TestApp {
    pub server: TestServer,
    pub collections: CollectionRepository,
    pub recordings: RecordingRepository,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn record_root(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// A closed, fully committed recording with one local WARC file.
    pub async fn committed_recording(&self, user: &str, coll: &str, id: &str, warc: &str) -> RecordingRef {
        let rec = RecordingRef::new(user, coll, id);
        self.recordings
            .create(
                &rec,
                &[
                    ("title", id),
                    ("created_at", "1767225600"),
                    ("updated_at", "1767229200"),
                ],
            )
            .await
            .expect("Failed to create recording");

        let dir = self.record_root().join(user);
        std::fs::create_dir_all(&dir).expect("Failed to create owner dir");
        let path = dir.join(warc);
        std::fs::write(&path, WARC_BODY).expect("Failed to write WARC");
        self.recordings
            .add_warc(&rec, warc, &FileLocation::local(&path))
            .await
            .expect("Failed to add WARC");
        rec
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|config| config).await
}

pub async fn setup_test_app_with(configure: impl FnOnce(Config) -> Config) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let config = configure(Config {
        record_root: temp_dir.path().to_path_buf(),
        public_origin: "http://archive.test".to_string(),
        ..Config::default()
    });

    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let keys = KeyTemplates::default();
    let collections = CollectionRepository::new(store.clone(), keys.clone());
    let recordings = RecordingRepository::new(store.clone(), keys, config.info_index_key.clone());

    collections
        .create_user("alice")
        .await
        .expect("Failed to create user");
    collections
        .create("alice", "coll1", &[("title", "My Collection")])
        .await
        .expect("Failed to create collection");

    let state = Arc::new(AppState::new(
        config,
        store,
        Arc::new(StorageRegistry::with_defaults()),
    ));
    let app = routes::setup_routes(state);
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        collections,
        recordings,
        temp_dir,
    }
}
