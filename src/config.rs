//! Configuration module for filelock.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{FilelockError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key (must be set).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_access_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_access_expiry() -> u64 {
    86400 // 1 day
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            jwt_secret: String::new(),
            access_token_expiry_secs: default_access_expiry(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/filelock.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// On-disk storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding permanent file artifacts.
    #[serde(default = "default_files_path")]
    pub files_path: String,
    /// Directory holding per-session chunk staging areas.
    #[serde(default = "default_staging_path")]
    pub staging_path: String,
    /// Maximum size of a single uploaded file in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_files_path() -> String {
    "data/uploads".to_string()
}

fn default_staging_path() -> String {
    "data/staging".to_string()
}

fn default_max_upload_size() -> u64 {
    100
}

impl StorageConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            files_path: default_files_path(),
            staging_path: default_staging_path(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Visibility given to a folder created while its tree is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NewFolderVisibility {
    /// New folders are always visible.
    #[default]
    DefaultVisible,
    /// New folders copy their parent's flag.
    InheritParent,
}

/// Chunked upload configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Idle time after which an upload session is swept.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Interval between expiry sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Maximum size of a single chunk in megabytes.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size_mb: u64,
    /// Visibility policy for folders created under a locked tree.
    #[serde(default)]
    pub new_folder_visibility: NewFolderVisibility,
}

fn default_session_ttl() -> u64 {
    86400 // 24 hours
}

fn default_sweep_interval() -> u64 {
    3600 // 1 hour
}

fn default_max_chunk_size() -> u64 {
    16
}

impl UploadConfig {
    /// Session TTL as a duration.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Maximum chunk size in bytes.
    pub fn max_chunk_size(&self) -> u64 {
        self.max_chunk_size_mb * 1024 * 1024
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            max_chunk_size_mb: default_max_chunk_size(),
            new_folder_visibility: NewFolderVisibility::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filelock.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Chunked upload configuration.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FilelockError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FilelockError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILELOCK_JWT_SECRET`: Override the JWT secret key
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("FILELOCK_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.server.jwt_secret = jwt_secret;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.server.jwt_secret.is_empty() {
            return Err(FilelockError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via FILELOCK_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.upload.session_ttl_secs == 0 {
            return Err(FilelockError::Config(
                "upload.session_ttl_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert!(config.server.cors_origins.is_empty());
        assert!(config.server.jwt_secret.is_empty());
        assert_eq!(config.server.access_token_expiry_secs, 86400);

        assert_eq!(config.database.path, "data/filelock.db");

        assert_eq!(config.storage.files_path, "data/uploads");
        assert_eq!(config.storage.staging_path, "data/staging");
        assert_eq!(config.storage.max_upload_size_mb, 100);
        assert_eq!(config.storage.max_upload_size(), 100 * 1024 * 1024);

        assert_eq!(config.upload.session_ttl_secs, 86400);
        assert_eq!(config.upload.sweep_interval_secs, 3600);
        assert_eq!(config.upload.max_chunk_size(), 16 * 1024 * 1024);
        assert_eq!(
            config.upload.new_folder_visibility,
            NewFolderVisibility::DefaultVisible
        );

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/filelock.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080
cors_origins = ["http://localhost:5173"]
jwt_secret = "test-secret-key"
access_token_expiry_secs = 600

[database]
path = "custom/db.sqlite"

[storage]
files_path = "custom/files"
staging_path = "custom/staging"
max_upload_size_mb = 20

[upload]
session_ttl_secs = 120
sweep_interval_secs = 30
max_chunk_size_mb = 4
new_folder_visibility = "inherit_parent"

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.server.jwt_secret, "test-secret-key");
        assert_eq!(config.server.access_token_expiry_secs, 600);

        assert_eq!(config.database.path, "custom/db.sqlite");

        assert_eq!(config.storage.files_path, "custom/files");
        assert_eq!(config.storage.staging_path, "custom/staging");
        assert_eq!(config.storage.max_upload_size_mb, 20);

        assert_eq!(config.upload.session_ttl(), Duration::from_secs(120));
        assert_eq!(config.upload.sweep_interval_secs, 30);
        assert_eq!(config.upload.max_chunk_size_mb, 4);
        assert_eq!(
            config.upload.new_folder_visibility,
            NewFolderVisibility::InheritParent
        );

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/app.log");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[server]
port = 3000
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.path, "data/filelock.db");
        assert_eq!(config.upload.session_ttl_secs, 86400);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.storage.staging_path, "data/staging");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        if let Err(FilelockError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_parse_unknown_visibility_policy() {
        let toml = r#"
[upload]
new_folder_visibility = "sometimes"
"#;
        assert!(Config::parse(toml).is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(FilelockError::Io(_))));
    }

    #[test]
    fn test_apply_env_overrides_jwt_secret() {
        let original = std::env::var("FILELOCK_JWT_SECRET").ok();

        std::env::set_var("FILELOCK_JWT_SECRET", "env-secret-key");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.server.jwt_secret, "env-secret-key");

        if let Some(val) = original {
            std::env::set_var("FILELOCK_JWT_SECRET", val);
        } else {
            std::env::remove_var("FILELOCK_JWT_SECRET");
        }
    }

    #[test]
    fn test_validate_requires_secret() {
        let config = Config::default();

        let result = config.validate();
        if let Err(FilelockError::Config(msg)) = result {
            assert!(msg.contains("jwt_secret"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config = Config::default();
        config.server.jwt_secret = "secret".to_string();
        config.upload.session_ttl_secs = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ok() {
        let mut config = Config::default();
        config.server.jwt_secret = "secret".to_string();

        assert!(config.validate().is_ok());
    }
}
