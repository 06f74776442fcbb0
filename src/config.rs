//! Configuration module for the course archive.

use serde::Deserialize;
use std::path::Path;

use crate::{ArchiveError, Result};

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
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
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
    "data/archive.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Document storage configuration.
///
/// The upload limits are used when a course has no explicit document
/// requirement row.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the mirrored folder tree.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Allowed file extensions (lowercase, without dot).
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Maximum number of files per submission.
    #[serde(default = "default_max_file_count")]
    pub max_file_count: usize,
    /// Maximum total size of one submission in megabytes.
    #[serde(default = "default_max_total_size_mb")]
    pub max_total_size_mb: u64,
}

fn default_base_path() -> String {
    "data/uploads".to_string()
}

fn default_allowed_extensions() -> Vec<String> {
    [
        "pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "jpg", "jpeg", "png", "gif", "txt",
        "zip",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_file_count() -> usize {
    10
}

fn default_max_total_size_mb() -> u64 {
    50
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            allowed_extensions: default_allowed_extensions(),
            max_file_count: default_max_file_count(),
            max_total_size_mb: default_max_total_size_mb(),
        }
    }
}

/// Authentication configuration.
///
/// Tokens are issued by an external identity service; this crate only
/// verifies them.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// Shared HS256 secret used to verify bearer tokens.
    #[serde(default)]
    pub jwt_secret: String,
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
    "logs/archive.log".to_string()
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
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ArchiveError::Io)?;
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
        toml::from_str(s).map_err(|e| ArchiveError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `ARCHIVE_JWT_SECRET`: Override the JWT secret key
    /// - `ARCHIVE_STORAGE_PATH`: Override the storage base path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("ARCHIVE_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.auth.jwt_secret = jwt_secret;
            }
        }
        if let Ok(base_path) = std::env::var("ARCHIVE_STORAGE_PATH") {
            if !base_path.is_empty() {
                self.storage.base_path = base_path;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ArchiveError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via ARCHIVE_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.storage.base_path.trim().is_empty() {
            return Err(ArchiveError::Config(
                "storage.base_path must not be empty".to_string(),
            ));
        }
        if self.storage.max_file_count == 0 {
            return Err(ArchiveError::Config(
                "storage.max_file_count must be at least 1".to_string(),
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
        assert_eq!(config.server.port, 8080);
        assert!(config.server.cors_origins.is_empty());

        assert_eq!(config.database.path, "data/archive.db");

        assert_eq!(config.storage.base_path, "data/uploads");
        assert!(config.storage.allowed_extensions.contains(&"pdf".to_string()));
        assert!(config.storage.allowed_extensions.contains(&"docx".to_string()));
        assert_eq!(config.storage.max_file_count, 10);
        assert_eq!(config.storage.max_total_size_mb, 50);

        assert!(config.auth.jwt_secret.is_empty());

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/archive.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 3000
cors_origins = ["http://localhost:5173"]

[database]
path = "custom/archive.sqlite"

[storage]
base_path = "/srv/archive"
allowed_extensions = ["pdf", "zip"]
max_file_count = 3
max_total_size_mb = 20

[auth]
jwt_secret = "test-secret-key"

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.database.path, "custom/archive.sqlite");
        assert_eq!(config.storage.base_path, "/srv/archive");
        assert_eq!(config.storage.allowed_extensions, vec!["pdf", "zip"]);
        assert_eq!(config.storage.max_file_count, 3);
        assert_eq!(config.storage.max_total_size_mb, 20);
        assert_eq!(config.auth.jwt_secret, "test-secret-key");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/app.log");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[server]
port = 9000

[storage]
max_file_count = 2
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.max_file_count, 2);

        // Defaults
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.max_total_size_mb, 50);
        assert_eq!(config.database.path, "data/archive.db");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.base_path, "data/uploads");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(ArchiveError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(ArchiveError::Io(_))));
    }

    #[test]
    fn test_apply_env_overrides() {
        let original_secret = std::env::var("ARCHIVE_JWT_SECRET").ok();
        let original_path = std::env::var("ARCHIVE_STORAGE_PATH").ok();

        std::env::set_var("ARCHIVE_JWT_SECRET", "env-secret-key");
        std::env::set_var("ARCHIVE_STORAGE_PATH", "");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.auth.jwt_secret, "env-secret-key");
        // Empty values never override
        assert_eq!(config.storage.base_path, "data/uploads");

        match original_secret {
            Some(val) => std::env::set_var("ARCHIVE_JWT_SECRET", val),
            None => std::env::remove_var("ARCHIVE_JWT_SECRET"),
        }
        match original_path {
            Some(val) => std::env::set_var("ARCHIVE_STORAGE_PATH", val),
            None => std::env::remove_var("ARCHIVE_STORAGE_PATH"),
        }
    }

    #[test]
    fn test_validate_requires_secret() {
        let config = Config::default();
        let result = config.validate();
        assert!(matches!(result, Err(ArchiveError::Config(msg)) if msg.contains("jwt_secret")));
    }

    #[test]
    fn test_validate_with_secret() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_file_count() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        config.storage.max_file_count = 0;
        assert!(config.validate().is_err());
    }
}
