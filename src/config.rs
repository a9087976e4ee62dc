use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::auth::{Credentials, LoginMode};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("required setting {0} is not set")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// A configured secret. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub port: Option<u16>,
    pub data_dir: Option<String>,
    pub static_dir: Option<String>,
    pub max_file_size: Option<u64>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSection {
    pub cloud_name: Option<String>,
    pub api_base_url: Option<String>,
    pub delivery_base_url: Option<String>,
    pub upload_timeout: Option<u64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub login_mode: Option<LoginMode>,
}

/// On-disk `config.toml`. Secrets are never read from here.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub media: MediaSection,
    pub auth: AuthSection,
}

#[derive(Clone, Debug)]
pub struct MediaHostConfig {
    pub cloud_name: String,
    pub api_key: Secret,
    pub api_secret: Secret,
    pub api_base_url: String,
    pub delivery_base_url: String,
    /// Seconds; 0 leaves the HTTP client default in place.
    pub upload_timeout: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub max_file_size: u64,
    pub log_level: String,
    pub media: MediaHostConfig,
    pub credentials: Credentials,
}

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;
const DEFAULT_API_BASE_URL: &str = "https://api.cloudinary.com/v1_1";
const DEFAULT_DELIVERY_BASE_URL: &str = "https://res.cloudinary.com";

impl Config {
    /// Load `config.toml` (if present) and overlay the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        let config_path = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base_dir.join("config.toml"));
        let config_file = if config_path.exists() {
            Some(ConfigFile::read(&config_path)?)
        } else {
            None
        };

        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_sources(&base_dir, config_file, &env)
    }

    /// Build a config from an optional file and a snapshot of environment variables.
    /// Env vars override the file; secrets only come from the environment.
    pub fn from_sources(
        base_dir: &Path,
        config_file: Option<ConfigFile>,
        env: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let file = config_file.unwrap_or_default();
        let var = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();

        let port = match var("PORT") {
            Some(p) => p.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: p,
            })?,
            None => file.server.port.unwrap_or(DEFAULT_PORT),
        };

        let max_file_size = match var("MAX_FILE_SIZE") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                key: "MAX_FILE_SIZE",
                value: v,
            })?,
            None => file.server.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE),
        };

        let data_dir = resolve_dir(
            base_dir,
            var("DATA_DIR").or(file.server.data_dir).unwrap_or_else(|| ".".to_string()),
        );
        let static_dir = resolve_dir(
            base_dir,
            var("STATIC_DIR")
                .or(file.server.static_dir)
                .unwrap_or_else(|| "static".to_string()),
        );

        let log_level = var("LOG_LEVEL")
            .or(file.server.log_level)
            .unwrap_or_else(|| "info".to_string());

        let upload_timeout = match var("UPLOAD_TIMEOUT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                key: "UPLOAD_TIMEOUT",
                value: v,
            })?,
            None => file.media.upload_timeout.unwrap_or(0),
        };

        let media = MediaHostConfig {
            cloud_name: var("CLOUD_NAME")
                .or(file.media.cloud_name)
                .ok_or(ConfigError::Missing("CLOUD_NAME"))?,
            api_key: required_secret(&var, "API_KEY")?,
            api_secret: required_secret(&var, "API_SECRET")?,
            api_base_url: var("CLOUDINARY_API_BASE_URL")
                .or(file.media.api_base_url)
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            delivery_base_url: var("CLOUDINARY_DELIVERY_BASE_URL")
                .or(file.media.delivery_base_url)
                .unwrap_or_else(|| DEFAULT_DELIVERY_BASE_URL.to_string()),
            upload_timeout,
        };

        let login_mode = match var("LOGIN_MODE") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                key: "LOGIN_MODE",
                value: v,
            })?,
            None => file.auth.login_mode.unwrap_or_default(),
        };

        let admin_login = match login_mode {
            LoginMode::AdminAware => Some((
                required_secret(&var, "ADMIN_USER")?,
                required_secret(&var, "ADMIN_PASS")?,
            )),
            LoginMode::SingleRole => None,
        };

        let credentials = Credentials {
            admin_key: required_secret(&var, "ADMIN_KEY")?,
            admin_login,
            app_login: (
                required_secret(&var, "APP_USER")?,
                required_secret(&var, "APP_PASS")?,
            ),
            login_mode,
        };

        Ok(Self {
            port,
            data_dir,
            static_dir,
            max_file_size,
            log_level,
            media,
            credentials,
        })
    }
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }
}

fn required_secret(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Secret, ConfigError> {
    var(key).map(Secret::new).ok_or(ConfigError::Missing(key))
}

fn resolve_dir(base_dir: &Path, dir: String) -> PathBuf {
    let path = PathBuf::from(dir);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}
