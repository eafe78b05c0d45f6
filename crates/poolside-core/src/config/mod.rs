//! Judge device configuration.
//!
//! One JSON file selects the store, the remote authority and the sync
//! cadence. Every field has a default, so a missing file yields a working
//! offline-only configuration backed by an in-memory store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db::StorageConfig;
use crate::error::{Error, Result};
use crate::sync::RetryPolicy;
use crate::util::{is_http_url, normalize_text_option};

pub const CONFIG_DIR_NAME: &str = "poolside";
pub const CONFIG_FILE_NAME: &str = "config.json";

pub const ENV_API_URL: &str = "POOLSIDE_API_URL";
pub const ENV_DB_PATH: &str = "POOLSIDE_DB_PATH";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct JudgeConfig {
    pub storage: StorageConfig,
    /// Remote authority base URL; `None` keeps the device offline-only
    pub api_base_url: Option<String>,
    pub sync_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub retry: RetryPolicy,
    /// Reference snapshot JSON loaded on session open
    pub snapshot_path: Option<PathBuf>,
    /// DQ code catalog JSON; without it any non-empty code is accepted
    pub dq_codes_path: Option<PathBuf>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            api_base_url: None,
            sync_interval_secs: 30,
            request_timeout_secs: 15,
            retry: RetryPolicy::default(),
            snapshot_path: None,
            dq_codes_path: None,
        }
    }
}

impl JudgeConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            Error::Config(format!("Failed to read config at {}: {error}", path.display()))
        })?;
        Self::from_json(&raw).map_err(|error| match error {
            Error::Config(message) => Error::Config(format!("{}: {message}", path.display())),
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(raw)
            .map_err(|error| Error::Config(format!("invalid config JSON: {error}")))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Apply `POOLSIDE_API_URL` / `POOLSIDE_DB_PATH` overrides from `lookup`
    /// (normally the process environment), then re-validate.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.api_base_url = Some(url);
        }
        if let Some(path) = normalize_text_option(lookup(ENV_DB_PATH)) {
            self.storage = StorageConfig::persistent(path);
        }
        self.normalize();
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api_base_url {
            if !is_http_url(url) {
                return Err(Error::Config(
                    "api_base_url must include http:// or https://".to_string(),
                ));
            }
        }
        if self.sync_interval_secs == 0 {
            return Err(Error::Config("sync_interval_secs must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be positive".into()));
        }
        if let StorageConfig::Persistent { path } = &self.storage {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("storage.path must not be empty".into()));
            }
        }
        Ok(())
    }

    pub const fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn normalize(&mut self) {
        self.api_base_url = normalize_text_option(self.api_base_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
    }
}
