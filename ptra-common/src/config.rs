//! Configuration loading and root folder resolution
//!
//! Every setting is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is never fatal; the compiled defaults are used instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "PTRA_ROOT_FOLDER";

/// Environment variable overriding the HTTP bind address
pub const ENV_BIND_ADDR: &str = "PTRA_BIND";

/// Environment variable pointing at an explicit TOML config file
pub const ENV_CONFIG_FILE: &str = "PTRA_CONFIG";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5780";
pub const DEFAULT_APP_NAME: &str = "Project Tracker & Reporting";
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_CSRF_TOKEN_EXPIRE_SECS: u64 = 1800;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_MAX_IMAGE_WIDTH: u32 = 1200;
pub const DEFAULT_MAX_IMAGE_HEIGHT: u32 = 800;

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "ptra.db";

/// Upload directory name inside the root folder
pub const UPLOAD_DIR_NAME: &str = "uploads";

fn default_allowed_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// `[logging]` table of the TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing level directive ("info", "debug", ...)
    pub level: Option<String>,
}

/// `[security]` table of the TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub session_timeout_secs: Option<u64>,
    pub csrf_token_expire_secs: Option<u64>,
}

/// `[uploads]` table of the TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_file_size: Option<usize>,
    pub allowed_extensions: Option<Vec<String>>,
    pub max_image_width: Option<u32>,
    pub max_image_height: Option<u32>,
}

/// On-disk TOML configuration. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub app_name: Option<String>,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub uploads: UploadConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub config_file: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Upload validation limits
#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_file_size: usize,
    pub allowed_extensions: Vec<String>,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: default_allowed_extensions(),
            max_width: DEFAULT_MAX_IMAGE_WIDTH,
            max_height: DEFAULT_MAX_IMAGE_HEIGHT,
        }
    }
}

/// Fully resolved application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub root_folder: PathBuf,
    pub bind_addr: String,
    pub app_name: String,
    pub log_level: String,
    pub session_timeout_secs: u64,
    pub csrf_token_expire_secs: u64,
    pub uploads: UploadLimits,
}

impl AppConfig {
    /// Configuration rooted at `root_folder` with every other value at its default
    pub fn with_root(root_folder: impl Into<PathBuf>) -> Self {
        Self {
            root_folder: root_folder.into(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            log_level: "info".to_string(),
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
            csrf_token_expire_secs: DEFAULT_CSRF_TOKEN_EXPIRE_SECS,
            uploads: UploadLimits::default(),
        }
    }

    /// Resolve configuration from CLI, environment, TOML file and defaults
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let explicit_file = cli
            .config_file
            .clone()
            .or_else(|| std::env::var(ENV_CONFIG_FILE).ok().map(PathBuf::from));
        let toml_config = load_toml_config(explicit_file.as_deref())?;
        Ok(Self::merge(cli, toml_config))
    }

    /// Merge already-loaded sources. Environment variables are read here.
    pub fn merge(cli: &CliOverrides, toml_config: TomlConfig) -> Self {
        let root_folder = cli
            .root_folder
            .clone()
            .or_else(|| std::env::var(ENV_ROOT_FOLDER).ok().map(PathBuf::from))
            .or(toml_config.root_folder)
            .unwrap_or_else(default_root_folder);

        let bind_addr = cli
            .bind_addr
            .clone()
            .or_else(|| std::env::var(ENV_BIND_ADDR).ok())
            .or(toml_config.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let log_level = cli
            .log_level
            .clone()
            .or(toml_config.logging.level)
            .unwrap_or_else(|| "info".to_string());

        let defaults = UploadLimits::default();
        let uploads = UploadLimits {
            max_file_size: toml_config
                .uploads
                .max_file_size
                .unwrap_or(defaults.max_file_size),
            allowed_extensions: toml_config
                .uploads
                .allowed_extensions
                .map(|exts| exts.into_iter().map(|e| e.to_lowercase()).collect())
                .unwrap_or(defaults.allowed_extensions),
            max_width: toml_config
                .uploads
                .max_image_width
                .unwrap_or(defaults.max_width),
            max_height: toml_config
                .uploads
                .max_image_height
                .unwrap_or(defaults.max_height),
        };

        Self {
            root_folder,
            bind_addr,
            app_name: toml_config
                .app_name
                .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            log_level,
            session_timeout_secs: toml_config
                .security
                .session_timeout_secs
                .unwrap_or(DEFAULT_SESSION_TIMEOUT_SECS),
            csrf_token_expire_secs: toml_config
                .security
                .csrf_token_expire_secs
                .unwrap_or(DEFAULT_CSRF_TOKEN_EXPIRE_SECS),
            uploads,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.root_folder.join(UPLOAD_DIR_NAME)
    }

    pub fn session_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_timeout_secs as i64)
    }

    pub fn csrf_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.csrf_token_expire_secs as i64)
    }

    /// Create root folder and upload directory if missing
    pub fn ensure_directories(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        std::fs::create_dir_all(self.upload_dir())?;
        Ok(())
    }
}

/// Load the TOML file.
///
/// An explicitly named file must exist. When no file is named the platform
/// default location is tried, and its absence yields the default config.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_file() {
            Some(path) if path.exists() => path,
            _ => {
                info!("No config file found, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str::<TomlConfig>(&content).map_err(|e| {
        warn!("Invalid config file {}: {}", path.display(), e);
        Error::Config(format!("Parse {} failed: {}", path.display(), e))
    })?;

    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Platform config file location (`~/.config/ptra/config.toml` on Linux)
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ptra").join("config.toml"))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ptra"))
        .unwrap_or_else(|| PathBuf::from("./ptra_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_parses_partial_file() {
        let config: TomlConfig = toml::from_str(
            r#"
            bind_addr = "0.0.0.0:8080"

            [uploads]
            max_file_size = 1024
            allowed_extensions = ["PNG"]
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_addr.as_deref(), Some("0.0.0.0:8080"));
        assert!(config.root_folder.is_none());
        assert_eq!(config.uploads.max_file_size, Some(1024));
        assert!(config.security.session_timeout_secs.is_none());
    }

    #[test]
    fn test_with_root_paths() {
        let config = AppConfig::with_root("/srv/ptra");
        assert_eq!(config.database_path(), PathBuf::from("/srv/ptra/ptra.db"));
        assert_eq!(config.upload_dir(), PathBuf::from("/srv/ptra/uploads"));
        assert_eq!(config.csrf_token_ttl(), chrono::Duration::seconds(1800));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = load_toml_config(Some(Path::new("/nonexistent/ptra/config.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
