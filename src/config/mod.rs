//! Known hosts configuration
//!
//! Resolves which known_hosts files a registry consults:
//! 1. Built-in defaults (OpenSSH system and user paths)
//! 2. Optional config file (~/.config/strict-hosts/config.toml)
//! 3. CLI flags

mod defaults;
mod paths;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::timeout::LookupBudget;

pub use defaults::{
    CONFIG_RELATIVE_PATH, DEFAULT_GLOBAL_FILES, DEFAULT_LOOKUP_TIMEOUT_SECONDS, DEFAULT_USER_FILES,
};
pub use paths::expand_path;

/// Which groups of known_hosts files to consult
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Global files, then user files
    #[default]
    All,
    /// System-wide files only
    Global,
    /// Per-user files only
    User,
}

impl Scope {
    pub fn includes_global(self) -> bool {
        matches!(self, Scope::All | Scope::Global)
    }

    pub fn includes_user(self) -> bool {
        matches!(self, Scope::All | Scope::User)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => write!(f, "all"),
            Scope::Global => write!(f, "global"),
            Scope::User => write!(f, "user"),
        }
    }
}

impl FromStr for Scope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Scope::All),
            "global" => Ok(Scope::Global),
            "user" => Ok(Scope::User),
            other => Err(ConfigError::InvalidValue {
                field: "scope".to_string(),
                reason: format!("expected all, global or user, got '{}'", other),
            }),
        }
    }
}

/// Errors that can occur when loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Home directory could not be determined")]
    NoHome,

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Known hosts lookup configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownHostsConfig {
    /// System-wide known_hosts files (default: /etc/ssh/ssh_known_hosts{,2})
    #[serde(default)]
    pub global_known_hosts_files: Option<Vec<String>>,

    /// Per-user known_hosts files (default: ~/.ssh/known_hosts{,2})
    #[serde(default)]
    pub user_known_hosts_files: Option<Vec<String>>,

    /// Which file groups to consult
    #[serde(default)]
    pub scope: Scope,

    /// Upper bound for a single lookup, in seconds
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_seconds: u64,
}

fn default_lookup_timeout() -> u64 {
    DEFAULT_LOOKUP_TIMEOUT_SECONDS
}

impl Default for KnownHostsConfig {
    fn default() -> Self {
        Self {
            global_known_hosts_files: None,
            user_known_hosts_files: None,
            scope: Scope::All,
            lookup_timeout_seconds: DEFAULT_LOOKUP_TIMEOUT_SECONDS,
        }
    }
}

impl KnownHostsConfig {
    /// Default config file location (~/.config/strict-hosts/config.toml)
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHome)?;
        Ok(home.join(CONFIG_RELATIVE_PATH))
    }

    /// Load from the default location, falling back to built-in defaults
    /// when the file does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = match Self::default_path() {
            Ok(path) => path,
            Err(ConfigError::NoHome) => return Ok(Self::default()),
            Err(e) => return Err(e),
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Load from a specific path
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: KnownHostsConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate paths and the lookup timeout
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, files) in [
            ("global_known_hosts_files", &self.global_known_hosts_files),
            ("user_known_hosts_files", &self.user_known_hosts_files),
        ] {
            if let Some(files) = files {
                if files.iter().any(|f| f.trim().is_empty()) {
                    return Err(ConfigError::InvalidValue {
                        field: field.to_string(),
                        reason: "paths must not be empty".to_string(),
                    });
                }
            }
        }

        LookupBudget::new(self.lookup_timeout_seconds)
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                field: "lookup_timeout_seconds".to_string(),
                reason: e.to_string(),
            })
    }

    /// Expanded global files, in consultation order
    pub fn global_files(&self) -> Vec<PathBuf> {
        expand_all(self.global_known_hosts_files.as_deref(), DEFAULT_GLOBAL_FILES)
    }

    /// Expanded user files, in consultation order
    pub fn user_files(&self) -> Vec<PathBuf> {
        expand_all(self.user_known_hosts_files.as_deref(), DEFAULT_USER_FILES)
    }

    /// Files for `scope`: global files first, then user files.
    pub fn files_for(&self, scope: Scope) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if scope.includes_global() {
            files.extend(self.global_files());
        }
        if scope.includes_user() {
            files.extend(self.user_files());
        }
        files
    }

    /// Files for the configured scope
    pub fn files(&self) -> Vec<PathBuf> {
        self.files_for(self.scope)
    }

    /// Lookup budget derived from `lookup_timeout_seconds`
    pub fn lookup_budget(&self) -> LookupBudget {
        LookupBudget::new(self.lookup_timeout_seconds)
    }
}

fn expand_all(configured: Option<&[String]>, defaults: &[&str]) -> Vec<PathBuf> {
    match configured {
        Some(files) => files.iter().map(|f| expand_path(Path::new(f))).collect(),
        None => defaults.iter().map(|f| expand_path(Path::new(f))).collect(),
    }
}
