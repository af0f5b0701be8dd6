//! Runtime configuration for a docnote process.
//!
//! # Responsibility
//! - Provide defaults for logging, storage location and user seed data.
//! - Parse and validate JSON configuration supplied by the host shell.
//!
//! # Invariants
//! - A validated config always has at least one user and the acting user
//!   exists in `users`.

use crate::logging::{default_log_level, normalize_level};
use crate::model::user::{default_users, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Configuration validation or parse failure.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    InvalidLogLevel(String),
    NoUsers,
    DuplicateUserId(UserId),
    UnknownCurrentUser(UserId),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config JSON: {err}"),
            Self::InvalidLogLevel(level) => write!(f, "invalid log_level `{level}`"),
            Self::NoUsers => write!(f, "config must declare at least one user"),
            Self::DuplicateUserId(id) => write!(f, "duplicate user id `{id}`"),
            Self::UnknownCurrentUser(id) => {
                write!(f, "current_user_id `{id}` is not a configured user")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling logs; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    /// SQLite file backing comment and resolution persistence.
    pub db_path: Option<PathBuf>,
    /// Author id stamped on new comments and replies.
    pub current_user_id: UserId,
    pub users: Vec<User>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: None,
            current_user_id: "1".to_string(),
            users: default_users(),
        }
    }
}

impl CoreConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))?;
        if self.users.is_empty() {
            return Err(ConfigError::NoUsers);
        }
        let mut seen = HashSet::with_capacity(self.users.len());
        for user in &self.users {
            if !seen.insert(user.id.as_str()) {
                return Err(ConfigError::DuplicateUserId(user.id.clone()));
            }
        }
        if !seen.contains(self.current_user_id.as_str()) {
            return Err(ConfigError::UnknownCurrentUser(
                self.current_user_id.clone(),
            ));
        }
        Ok(())
    }

    /// Database path, defaulting to `docnote.sqlite3` in the temp directory.
    pub fn effective_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("docnote.sqlite3"))
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};

    #[test]
    fn default_config_is_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.users.len(), 3);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = CoreConfig::from_json_str(r#"{"current_user_id":"2"}"#).expect("parse");
        assert_eq!(config.current_user_id, "2");
        assert_eq!(config.users.len(), 3);
        assert!(config.db_path.is_none());
    }

    #[test]
    fn unknown_current_user_is_rejected() {
        let err = CoreConfig::from_json_str(r#"{"current_user_id":"9"}"#).expect_err("invalid");
        assert!(matches!(err, ConfigError::UnknownCurrentUser(id) if id == "9"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = CoreConfig::from_json_str(r#"{"theme":"dark"}"#).expect_err("invalid");
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
