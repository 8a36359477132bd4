//! Runtime configuration for board core consumers.
//!
//! # Responsibility
//! - Load `BoardConfig` from TOML with defaults for every missing key.
//! - Reject listing settings that would make page windows meaningless.

use crate::pagination::DEFAULT_WINDOW_SIZE;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 50;

/// Configuration load/validation failure.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config TOML: {err}"),
            Self::Invalid { field, reason } => write!(f, "invalid config `{field}`: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// `None` opens an in-memory database.
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    /// `None` disables the file logger.
    pub log_dir: Option<PathBuf>,
    pub page_window_size: u32,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: "info".to_string(),
            log_dir: None,
            page_window_size: DEFAULT_WINDOW_SIZE,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl BoardConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("page_window_size", self.page_window_size),
            ("default_page_size", self.default_page_size),
            ("max_page_size", self.max_page_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be >= 1".to_string(),
                });
            }
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid {
                field: "default_page_size",
                reason: format!(
                    "{} exceeds max_page_size {}",
                    self.default_page_size, self.max_page_size
                ),
            });
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "log_level",
                reason: "must not be blank".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BoardConfig, ConfigError};
    use std::path::PathBuf;

    #[test]
    fn empty_document_uses_defaults() {
        let config = BoardConfig::from_toml_str("").unwrap();
        assert_eq!(config, BoardConfig::default());
        assert_eq!(config.page_window_size, 10);
    }

    #[test]
    fn partial_document_overrides_keys() {
        let config = BoardConfig::from_toml_str(
            r#"
            database_path = "/tmp/board.sqlite3"
            default_page_size = 20
            "#,
        )
        .unwrap();
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/tmp/board.sqlite3"))
        );
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.max_page_size, 50);
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = BoardConfig::from_toml_str("page_window_size = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "page_window_size",
                ..
            }
        ));
    }

    #[test]
    fn default_page_size_above_max_is_rejected() {
        let err =
            BoardConfig::from_toml_str("default_page_size = 60\nmax_page_size = 50").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
