//! Configuration loading for the Bugtriage API.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `BUGTRIAGE_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application configuration derived from `BUGTRIAGE_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// HS256 signing secret for session tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Session token lifetime in hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
    /// Base URL of the transcription service; absent means reports are
    /// ingested without a transcript.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcriber_url: Option<String>,
    /// Base URL of the labeling service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labeler_url: Option<String>,
    /// Base URL of the object-storage upload endpoint for report videos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_storage_url: Option<String>,
    /// Bounded timeout applied to every collaborator call.
    #[serde(default = "default_collaborator_timeout_ms")]
    pub collaborator_timeout_ms: u64,
    /// Upper bound on the feedback submission body, screen recording
    /// included.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_profile() -> String {
    "dev".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_jwt_secret() -> String {
    // Dev-only placeholder; production deployments must override it.
    "change-me".to_string()
}

fn default_token_ttl_hours() -> u64 {
    24
}

fn default_collaborator_timeout_ms() -> u64 {
    30_000
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: default_token_ttl_hours(),
            transcriber_url: None,
            labeler_url: None,
            video_storage_url: None,
            collaborator_timeout_ms: default_collaborator_timeout_ms(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read env file {path}: {error}")]
    EnvFile { path: String, error: String },
    #[error("invalid bind address '{addr}': {error}")]
    InvalidBindAddr { addr: String, error: String },
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

impl AppConfig {
    /// Resolve the configured bind address into a `SocketAddr`.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.api_bind_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidBindAddr {
                addr: self.api_bind_addr.clone(),
                error: e.to_string(),
            })
    }

    /// Serialize the configuration with secrets masked, for startup logging.
    pub fn redacted_json(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            for key in ["JWT_SECRET", "DATABASE_URL"] {
                if obj.contains_key(key) {
                    obj.insert(key.to_string(), serde_json::Value::String("***".into()));
                }
            }
        }
        serde_json::to_string(&value)
    }
}

/// Loads configuration from layered `.env` files and the process environment.
///
/// Layering order (later wins): `.env` -> `.env.<profile>` -> process
/// environment. Only variables prefixed with `BUGTRIAGE_` are considered.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Load the effective configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut layered = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("BUGTRIAGE_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let mut config = AppConfig::default();

        if let Some(v) = take(&mut layered, "PROFILE") {
            config.profile = v;
        }
        if let Some(v) = take(&mut layered, "API_BIND_ADDR") {
            config.api_bind_addr = v;
        }
        if let Some(v) = take(&mut layered, "LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = take(&mut layered, "LOG_FORMAT") {
            config.log_format = v;
        }
        if let Some(v) = take(&mut layered, "DATABASE_URL") {
            config.database_url = v;
        }
        if let Some(v) = take(&mut layered, "DB_MAX_CONNECTIONS") {
            config.db_max_connections = parse(&v, "DB_MAX_CONNECTIONS")?;
        }
        if let Some(v) = take(&mut layered, "DB_ACQUIRE_TIMEOUT_MS") {
            config.db_acquire_timeout_ms = parse(&v, "DB_ACQUIRE_TIMEOUT_MS")?;
        }
        if let Some(v) = take(&mut layered, "JWT_SECRET") {
            config.jwt_secret = v;
        }
        if let Some(v) = take(&mut layered, "TOKEN_TTL_HOURS") {
            config.token_ttl_hours = parse(&v, "TOKEN_TTL_HOURS")?;
        }
        config.transcriber_url = take(&mut layered, "TRANSCRIBER_URL");
        config.labeler_url = take(&mut layered, "LABELER_URL");
        config.video_storage_url = take(&mut layered, "VIDEO_STORAGE_URL");
        if let Some(v) = take(&mut layered, "COLLABORATOR_TIMEOUT_MS") {
            config.collaborator_timeout_ms = parse(&v, "COLLABORATOR_TIMEOUT_MS")?;
        }
        if let Some(v) = take(&mut layered, "MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse(&v, "MAX_UPLOAD_BYTES")?;
        }

        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        let mut layered = BTreeMap::new();

        for file in [".env", ".env.local"] {
            let path = self.base_dir.join(file);
            if !path.exists() {
                continue;
            }
            let iter = dotenvy::from_path_iter(&path).map_err(|e| ConfigError::EnvFile {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
            for item in iter {
                let (key, value) = item.map_err(|e| ConfigError::EnvFile {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?;
                if let Some(stripped) = key.strip_prefix("BUGTRIAGE_") {
                    layered.insert(stripped.to_string(), value);
                }
            }
        }

        Ok(layered)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn take(map: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    map.remove(key).filter(|v| !v.is_empty())
}

fn parse<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
