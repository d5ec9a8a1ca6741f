use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://localhost:8000";
const DEFAULT_UPLOAD_PATH: &str = "/new/upload";
const DEFAULT_SESSION_FILE: &str = ".crowd_session.json";
const DEFAULT_ZONES_FILE: &str = "zones.json";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;
const DEFAULT_ACCOUNT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_NOTICE_SECS: u64 = 5;
const CONFIG_BASENAME: &str = "crowd_dash";
const ENV_PREFIX: &str = "CROWD";

/// Client configuration: built-in defaults, then `crowd_dash.toml` (or an explicit file),
/// then `CROWD_*` environment variables.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub server: String,
    pub upload_path: String,
    pub session_file: PathBuf,
    pub zones_file: PathBuf,
    pub max_upload_bytes: u64,
    pub account_timeout_secs: u64,
    pub notice_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            zones_file: PathBuf::from(DEFAULT_ZONES_FILE),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            account_timeout_secs: DEFAULT_ACCOUNT_TIMEOUT_SECS,
            notice_secs: DEFAULT_NOTICE_SECS,
        }
    }
}

impl ClientConfig {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) => File::from(path).required(true),
            None => File::with_name(CONFIG_BASENAME).required(false),
        };

        let mut config: ClientConfig = Config::builder()
            .set_default("server", DEFAULT_SERVER)?
            .set_default("upload_path", DEFAULT_UPLOAD_PATH)?
            .set_default("session_file", DEFAULT_SESSION_FILE)?
            .set_default("zones_file", DEFAULT_ZONES_FILE)?
            .set_default("max_upload_bytes", DEFAULT_MAX_UPLOAD_BYTES)?
            .set_default("account_timeout_secs", DEFAULT_ACCOUNT_TIMEOUT_SECS)?
            .set_default("notice_secs", DEFAULT_NOTICE_SECS)?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.server = config.server.trim_end_matches('/').to_string();
        if !config.upload_path.starts_with('/') {
            config.upload_path.insert(0, '/');
        }
        Ok(config)
    }

    pub fn upload_url(&self) -> String {
        format!("{}{}", self.server, self.upload_path)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    pub fn account_timeout(&self) -> Duration {
        Duration::from_secs(self.account_timeout_secs)
    }

    pub fn notice_lifetime(&self) -> Duration {
        Duration::from_secs(self.notice_secs)
    }

    pub fn max_upload_mb(&self) -> u64 {
        self.max_upload_bytes / (1024 * 1024)
    }
}
