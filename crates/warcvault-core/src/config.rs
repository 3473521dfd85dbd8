//! Configuration module
//!
//! Environment-driven configuration for the storage committer and the download
//! API: fast-store connection, record root, default storage profile, key
//! templates and timing knobs.

use std::env;
use std::path::PathBuf;

use crate::keys::{KeyTemplate, KeyTemplates};
use crate::models::StorageProfile;
use crate::storage_types::StorageBackend;

// Common constants
const COMMIT_WAIT_SECS: u64 = 30;
const SCAN_INTERVAL_SECS: u64 = 30;
const PRESIGN_EXPIRY_SECS: u64 = 3600;
const SERVER_PORT: u16 = 8088;
const TEMP_PREFIX: &str = "temp-";
const STORAGE_PATH_TEMPL: &str = "{user}/{coll}/";
const INDEX_NAME_TEMPL: &str = "{timestamp}-{random}.cdxj";
const DOWNLOAD_FILENAME_TEMPL: &str = "{title}-{timestamp}.warc.gz";
const INFO_INDEX_KEY: &str = "index_file";
const SOFTWARE_NAME: &str = "Warcvault";

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub server_port: u16,
    /// Origin used to build same-service download URLs (e.g. "https://archive.example.org")
    pub public_origin: String,
    /// `redis://...` for Redis, `memory://` for the in-process store
    pub redis_base_url: String,
    pub record_root: PathBuf,
    /// Owners whose name starts with this prefix are temporary and never migrated
    pub temp_prefix: String,
    pub default_storage: StorageProfile,
    pub keys: KeyTemplates,
    pub index_name_templ: String,
    /// Field of the recording info map holding the consolidated index location
    pub info_index_key: String,
    pub commit_wait_secs: u64,
    pub scan_interval_secs: u64,
    pub download_chunk_encoded: bool,
    pub download_filename_templ: String,
    pub presign_expiry_secs: u64,
    pub software: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server_port: SERVER_PORT,
            public_origin: format!("http://localhost:{}", SERVER_PORT),
            redis_base_url: "memory://".to_string(),
            record_root: PathBuf::from("./data/record"),
            temp_prefix: TEMP_PREFIX.to_string(),
            default_storage: StorageProfile::new(StorageBackend::Local.as_str()),
            keys: KeyTemplates::default(),
            index_name_templ: INDEX_NAME_TEMPL.to_string(),
            info_index_key: INFO_INDEX_KEY.to_string(),
            commit_wait_secs: COMMIT_WAIT_SECS,
            scan_interval_secs: SCAN_INTERVAL_SECS,
            download_chunk_encoded: false,
            download_filename_templ: DOWNLOAD_FILENAME_TEMPL.to_string(),
            presign_expiry_secs: PRESIGN_EXPIRY_SECS,
            software: format!("{} v{}", SOFTWARE_NAME, env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or(defaults.environment);

        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.server_port);

        let public_origin = env::var("PUBLIC_ORIGIN")
            .map(|o| o.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://localhost:{}", server_port));

        let redis_base_url = env::var("REDIS_BASE_URL").unwrap_or(defaults.redis_base_url);

        let record_root = env::var("RECORD_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.record_root);

        let temp_prefix = env::var("TEMP_PREFIX").unwrap_or(defaults.temp_prefix);

        let default_storage = default_storage_profile();

        let keys = KeyTemplates {
            user_info: template_from_env("USER_INFO_KEY_TEMPL", defaults.keys.user_info),
            user_colls: template_from_env("USER_COLLS_KEY_TEMPL", defaults.keys.user_colls),
            coll_info: template_from_env("COLL_INFO_KEY_TEMPL", defaults.keys.coll_info),
            coll_recs: template_from_env("COLL_RECS_KEY_TEMPL", defaults.keys.coll_recs),
            rec_info: template_from_env("REC_INFO_KEY_TEMPL", defaults.keys.rec_info),
            rec_warc: template_from_env("WARC_KEY_TEMPL", defaults.keys.rec_warc),
            rec_open: template_from_env("REC_OPEN_KEY_TEMPL", defaults.keys.rec_open),
            rec_cdxj: template_from_env("CDXJ_KEY_TEMPL", defaults.keys.rec_cdxj),
            commit_wait: template_from_env("COMMIT_WAIT_TEMPL", defaults.keys.commit_wait),
            storage_profile: template_from_env("STORAGE_KEY_TEMPL", defaults.keys.storage_profile),
        };

        let index_name_templ = env::var("INDEX_NAME_TEMPL").unwrap_or(defaults.index_name_templ);
        let info_index_key = env::var("INFO_INDEX_KEY").unwrap_or(defaults.info_index_key);

        let commit_wait_secs = env::var("COMMIT_WAIT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.commit_wait_secs);

        let scan_interval_secs = env::var("TEMP_SLEEP_CHECK")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.scan_interval_secs);

        let download_chunk_encoded = env::var("DOWNLOAD_CHUNK_ENCODED")
            .map(|v| parse_bool(&v))
            .unwrap_or(defaults.download_chunk_encoded);

        let download_filename_templ =
            env::var("DOWNLOAD_FILENAME_TEMPL").unwrap_or(defaults.download_filename_templ);

        let presign_expiry_secs = env::var("PRESIGN_EXPIRY_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.presign_expiry_secs);

        let config = Config {
            environment,
            server_port,
            public_origin,
            redis_base_url,
            record_root,
            temp_prefix,
            default_storage,
            keys,
            index_name_templ,
            info_index_key,
            commit_wait_secs,
            scan_interval_secs,
            download_chunk_encoded,
            download_filename_templ,
            presign_expiry_secs,
            software: defaults.software,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.redis_base_url.starts_with("redis://")
            && !self.redis_base_url.starts_with("rediss://")
            && !self.redis_base_url.starts_with("memory://")
        {
            return Err(anyhow::anyhow!(
                "REDIS_BASE_URL must start with redis://, rediss:// or memory://"
            ));
        }

        if self.commit_wait_secs == 0 {
            return Err(anyhow::anyhow!("COMMIT_WAIT_SECS must be greater than 0"));
        }

        if self.default_storage.backend_type == StorageBackend::S3.as_str()
            && self.default_storage.param("remote_url_templ").is_none()
        {
            return Err(anyhow::anyhow!(
                "DEFAULT_STORAGE=s3 requires S3_ROOT to be set"
            ));
        }

        if !self.keys.rec_cdxj.as_str().contains("{rec}") {
            return Err(anyhow::anyhow!("CDXJ_KEY_TEMPL must contain {{rec}}"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn is_temp_owner(&self, owner: &str) -> bool {
        !self.temp_prefix.is_empty() && owner.starts_with(&self.temp_prefix)
    }

    /// Directory holding an owner's uncommitted files
    pub fn owner_dir(&self, owner: &str) -> PathBuf {
        self.record_root.join(owner)
    }
}

/// Build the process-wide default storage profile from `DEFAULT_STORAGE`.
fn default_storage_profile() -> StorageProfile {
    let storage_type = env::var("DEFAULT_STORAGE").unwrap_or_else(|_| "local".to_string());
    storage_profile_for(&storage_type)
}

/// Builds the profile for a storage type name. Names other than the built-in
/// backends are kept as-is so a registered custom storage can resolve them.
fn storage_profile_for(storage_type: &str) -> StorageProfile {
    let storage_type = storage_type.trim().to_lowercase();
    let is_s3 = storage_type == StorageBackend::S3.as_str();
    let mut profile = StorageProfile::new(storage_type);

    if is_s3 {
        if let Ok(s3_root) = env::var("S3_ROOT") {
            let path_templ =
                env::var("STORAGE_PATH_TEMPL").unwrap_or_else(|_| STORAGE_PATH_TEMPL.to_string());
            let root = if s3_root.ends_with('/') {
                s3_root
            } else {
                format!("{}/", s3_root)
            };
            profile = profile.with_param("remote_url_templ", format!("{}{}", root, path_templ));
        }
        if let Ok(region) = env::var("S3_REGION").or_else(|_| env::var("AWS_REGION")) {
            profile = profile.with_param("region", region);
        }
        if let Ok(endpoint) = env::var("S3_ENDPOINT") {
            profile = profile.with_param("endpoint", endpoint);
        }
    }

    profile
}

fn template_from_env(var: &str, default: KeyTemplate) -> KeyTemplate {
    env::var(var).map(KeyTemplate::new).unwrap_or(default)
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
