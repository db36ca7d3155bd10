//! Configuration management
//!
//! Configuration is read from `config.yml` and can be overridden by
//! `VITALOG_*` environment variables. Missing values fall back to defaults,
//! so an absent or empty file yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Minimum length of a configured session secret, in bytes
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Longest allowed session lifetime: ten years
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Session cookie configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Site-wide presentation settings
    #[serde(default)]
    pub site: SiteConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL or file path
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/vitalog.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory uploaded files are written to
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Prefix of the stored reference, relative to the static root
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            public_prefix: default_public_prefix(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("static/uploads")
}

fn default_public_prefix() -> String {
    "uploads".to_string()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HMAC signing secret. A random key is generated at startup when unset,
    /// which invalidates all sessions on restart.
    #[serde(default)]
    pub secret: Option<String>,
    /// Session lifetime in hours
    #[serde(default = "default_session_ttl_hours")]
    pub ttl_hours: i64,
    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Mark the cookie `Secure` (HTTPS only)
    #[serde(default)]
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_hours: default_session_ttl_hours(),
            cookie_name: default_cookie_name(),
            secure: false,
        }
    }
}

fn default_session_ttl_hours() -> i64 {
    7 * 24
}

fn default_cookie_name() -> String {
    "session".to_string()
}

/// Site-wide presentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site name shown in page titles and the header
    #[serde(default = "default_site_name")]
    pub name: String,
    /// Root directory served under `/static`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Load templates from this directory instead of the embedded set
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            static_dir: default_static_dir(),
            templates_dir: None,
        }
    }
}

fn default_site_name() -> String {
    "Vitalog".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or empty file yields the defaults; a malformed file is an
    /// error carrying the line and column of the problem.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })
    }

    /// Load configuration from file, apply environment overrides and validate.
    ///
    /// Recognised variables:
    /// - VITALOG_SERVER_HOST, VITALOG_SERVER_PORT
    /// - VITALOG_DATABASE_DRIVER, VITALOG_DATABASE_URL
    /// - VITALOG_UPLOAD_PATH, VITALOG_UPLOAD_MAX_FILE_SIZE
    /// - VITALOG_SESSION_SECRET, VITALOG_SESSION_TTL_HOURS, VITALOG_SESSION_SECURE
    /// - VITALOG_SITE_NAME, VITALOG_SITE_STATIC_DIR, VITALOG_SITE_TEMPLATES_DIR
    pub fn load_with_env(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("VITALOG_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("VITALOG_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(driver) = std::env::var("VITALOG_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => tracing::warn!("Ignoring unknown VITALOG_DATABASE_DRIVER: {}", driver),
            }
        }
        if let Ok(url) = std::env::var("VITALOG_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(path) = std::env::var("VITALOG_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }
        if let Ok(size) = std::env::var("VITALOG_UPLOAD_MAX_FILE_SIZE") {
            if let Ok(size) = size.parse::<u64>() {
                self.upload.max_file_size = size;
            }
        }

        if let Ok(secret) = std::env::var("VITALOG_SESSION_SECRET") {
            self.session.secret = Some(secret);
        }
        if let Ok(ttl) = std::env::var("VITALOG_SESSION_TTL_HOURS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.session.ttl_hours = ttl;
            }
        }
        if let Ok(secure) = std::env::var("VITALOG_SESSION_SECURE") {
            self.session.secure = matches!(secure.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Ok(name) = std::env::var("VITALOG_SITE_NAME") {
            self.site.name = name;
        }
        if let Ok(dir) = std::env::var("VITALOG_SITE_STATIC_DIR") {
            self.site.static_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("VITALOG_SITE_TEMPLATES_DIR") {
            self.site.templates_dir = Some(PathBuf::from(dir));
        }
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secret) = &self.session.secret {
            if secret.len() < MIN_SESSION_SECRET_LEN {
                return Err(ConfigError::ValidationError(format!(
                    "session.secret must be at least {} bytes",
                    MIN_SESSION_SECRET_LEN
                )));
            }
        }
        if self.session.ttl_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "session.ttl_hours must be positive".to_string(),
            ));
        }
        if self.session.ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(ConfigError::ValidationError(format!(
                "session.ttl_hours must be at most {}",
                MAX_SESSION_TTL_HOURS
            )));
        }
        if self.session.cookie_name == crate::web::flash::FLASH_COOKIE {
            return Err(ConfigError::ValidationError(format!(
                "session.cookie_name '{}' is reserved for flash messages",
                self.session.cookie_name
            )));
        }
        if self.session.cookie_name.is_empty()
            || !self
                .session
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::ValidationError(format!(
                "session.cookie_name is not a valid cookie name: '{}'",
                self.session.cookie_name
            )));
        }
        if self.upload.max_file_size == 0 {
            return Err(ConfigError::ValidationError(
                "upload.max_file_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
