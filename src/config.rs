use serde::Deserialize;
use std::path::PathBuf;

use crate::engine::DEFAULT_STREAK_WINDOW_DAYS;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Path to the SQLite database
    pub database_path: PathBuf,
    /// HS256 secret for bearer JWTs. Without it only API keys are accepted.
    pub jwt_secret: Option<String>,
    /// Allowed CORS origin. Any origin when unset.
    pub frontend_url: Option<String>,
    /// Days looked back when computing streaks
    pub streak_window_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("amal")
                .join("amal.db"),
            jwt_secret: None,
            frontend_url: None,
            streak_window_days: DEFAULT_STREAK_WINDOW_DAYS,
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(port) = std::env::var("AMAL_PORT") {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue("AMAL_PORT", port))?;
        }
        if let Ok(db_path) = std::env::var("AMAL_DATABASE_PATH") {
            self.database_path = PathBuf::from(db_path);
        }
        if let Ok(secret) = std::env::var("AMAL_JWT_SECRET") {
            self.jwt_secret = Some(secret).filter(|s| !s.is_empty());
        }
        if let Ok(url) = std::env::var("AMAL_FRONTEND_URL") {
            self.frontend_url = Some(url).filter(|s| !s.is_empty());
        }
        if let Ok(days) = std::env::var("AMAL_STREAK_WINDOW_DAYS") {
            self.streak_window_days = days
                .parse()
                .ok()
                .filter(|d| *d > 0)
                .ok_or(ConfigError::InvalidValue("AMAL_STREAK_WINDOW_DAYS", days))?;
        }
        Ok(())
    }

    /// Default config file path: ~/.config/amal/config.yaml, or `AMAL_CONFIG`
    pub fn default_config_path() -> PathBuf {
        if let Ok(path) = std::env::var("AMAL_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("amal")
            .join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    e
                )
            }
            ConfigError::InvalidValue(var, value) => {
                write!(f, "Invalid value for {}: '{}'", var, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
