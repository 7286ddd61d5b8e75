use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::assemble::{AssemblerConfig, ClipNaming};
use crate::media::ResolverConfig;
use crate::timeline::writer::WriterConfig;

pub const DEFAULT_API_URL: &str = "https://api.video-jungle.com";
const CONFIG_DIR_NAME: &str = "cutlist";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("No API key configured (set VJ_API_KEY or api_key in the config file)")]
    MissingApiKey,
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_url: String,
    pub download_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub jobs: usize,
    pub unique_clip_names: bool,
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            download_dir: PathBuf::from("downloads"),
            request_timeout_secs: 30,
            download_timeout_secs: 600,
            max_retries: 2,
            retry_backoff_ms: 500,
            jobs: 1,
            unique_clip_names: false,
            pretty: true,
        }
    }
}

// Hand-written so the API key never reaches a log line.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("download_dir", &self.download_dir)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("jobs", &self.jobs)
            .field("unique_clip_names", &self.unique_clip_names)
            .field("pretty", &self.pretty)
            .finish()
    }
}

impl Config {
    /// Load `path`, or the per-user config file when it exists, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.is_file() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.check()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("VJ_API_KEY").filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("VJ_API_URL").filter(|u| !u.is_empty()) {
            self.api_url = url;
        }
        if let Some(dir) = lookup("CUTLIST_DOWNLOAD_DIR").filter(|d| !d.is_empty()) {
            self.download_dir = PathBuf::from(dir);
        }
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::Invalid("jobs must be at least 1".into()));
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_url is empty".into()));
        }
        if self.request_timeout_secs == 0 || self.download_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least one second".into()));
        }
        Ok(())
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_retries: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn assembler_config(&self) -> AssemblerConfig {
        AssemblerConfig {
            jobs: self.jobs,
            naming: if self.unique_clip_names {
                ClipNaming::Indexed
            } else {
                ClipNaming::Shared
            },
        }
    }

    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig { pretty: self.pretty }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
