use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::retry::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File,
    Redis,
}

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub api_base_url: String,
    #[serde(default = "default_api_timeout_ms")]
    pub api_timeout_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_storage_backend")]
    pub storage_backend: String,
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    pub redis_url: Option<String>,

    pub fcm_project_id: Option<String>,
    pub fcm_device_token: Option<String>,
    #[serde(default = "default_fcm_base_url")]
    pub fcm_base_url: String,

    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_retry_backoff_multiplier")]
    pub retry_backoff_multiplier: u64,

    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

fn default_api_timeout_ms() -> u64 {
    30_000
}

fn default_page_size() -> u32 {
    10
}

fn default_storage_backend() -> String {
    "file".to_string()
}

fn default_storage_path() -> String {
    ".tickbook".to_string()
}

fn default_fcm_base_url() -> String {
    "https://fcm.googleapis.com".to_string()
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_initial_retry_delay_ms() -> u64 {
    200
}

fn default_max_retry_delay_ms() -> u64 {
    2_000
}

fn default_retry_backoff_multiplier() -> u64 {
    2
}

fn default_server_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from explicit `(NAME, value)` pairs instead of the
    /// process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let config = envy::from_iter::<_, Self>(
            vars.into_iter().map(|(k, v)| (k.into(), v.into())),
        )
        .map_err(|e| anyhow!("Invalid or missing configuration value: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.storage_backend()? == StorageBackend::Redis && self.redis_url.is_none() {
            return Err(anyhow!("REDIS_URL is required when STORAGE_BACKEND is redis"));
        }

        if self.max_retry_attempts == 0 {
            return Err(anyhow!("MAX_RETRY_ATTEMPTS must be at least 1"));
        }

        Ok(())
    }

    pub fn storage_backend(&self) -> Result<StorageBackend, Error> {
        match self.storage_backend.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            "redis" => Ok(StorageBackend::Redis),
            other => Err(anyhow!("Unknown storage backend '{}'", other)),
        }
    }

    /// Popups are only delivered when both the FCM project and a device
    /// token are configured.
    pub fn fcm_target(&self) -> Option<(&str, &str)> {
        match (&self.fcm_project_id, &self.fcm_device_token) {
            (Some(project), Some(token)) if !project.is_empty() && !token.is_empty() => {
                Some((project.as_str(), token.as_str()))
            }
            _ => None,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from_config(self)
    }
}
