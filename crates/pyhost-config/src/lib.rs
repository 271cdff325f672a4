//! Configuration file for the pyhost bridge
//!
//! A single TOML file controls which startup module the bridge imports,
//! whether the search-path repair runs, and the Python environment the
//! embedded interpreter starts with. Every key is optional.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Module imported by Register when nothing else is configured
pub const DEFAULT_STARTUP_MODULE: &str = "startup";

/// Registry subkey (below `PythonPath`) that holds the core directory
pub const DEFAULT_SEARCH_PATH_KEY: &str = "PyHost";

/// Environment variable that overrides the config file location
pub const CONFIG_ENV_VAR: &str = "PYHOST_CONFIG";

/// Pointer file next to the default config that redirects to another path
pub const POINTER_FILE_NAME: &str = ".pyhost_config_path";

const CONFIG_FILE_NAME: &str = "pyhost.toml";

/// Keys accepted by `get`/`set`, in display order
pub const KEYS: &[&str] = &[
    "startup-module",
    "search-path-key",
    "repair-search-path",
    "python-home",
    "python-path",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key: {0}. Supported keys: {keys}", keys = KEYS.join(", "))]
    UnknownKey(String),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startup_module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_path_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair_search_path: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_home: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_path: Option<String>,
}

impl Config {
    /// Resolve the config file location
    ///
    /// `PYHOST_CONFIG` wins if set and non-empty, then a pointer file next
    /// to the default location, then the platform default.
    pub fn path() -> PathBuf {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }

        let default = default_config_dir().join(CONFIG_FILE_NAME);

        if let Some(parent) = default.parent() {
            let pointer = parent.join(POINTER_FILE_NAME);
            if let Ok(contents) = fs::read_to_string(&pointer) {
                let trimmed = contents.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
        }

        default
    }

    /// Path of the pointer file used by `pyhost config path <new>`
    pub fn pointer_path() -> PathBuf {
        default_config_dir().join(POINTER_FILE_NAME)
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path())
    }

    /// Load from an explicit file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "startup-module" => self.startup_module.clone(),
            "search-path-key" => self.search_path_key.clone(),
            "repair-search-path" => self.repair_search_path.map(|v| v.to_string()),
            "python-home" => self.python_home.clone(),
            "python-path" => self.python_path.clone(),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<(), ConfigError> {
        match key {
            "startup-module" => self.startup_module = Some(value),
            "search-path-key" => self.search_path_key = Some(value),
            "repair-search-path" => {
                let parsed = value.parse::<bool>().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone(),
                    reason: "expected true or false".to_string(),
                })?;
                self.repair_search_path = Some(parsed);
            }
            "python-home" => self.python_home = Some(value),
            "python-path" => self.python_path = Some(value),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.startup_module.is_none()
            && self.search_path_key.is_none()
            && self.repair_search_path.is_none()
            && self.python_home.is_none()
            && self.python_path.is_none()
    }

    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        KEYS.iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }

    pub fn get_startup_module(&self) -> String {
        self.startup_module
            .clone()
            .unwrap_or_else(|| DEFAULT_STARTUP_MODULE.to_string())
    }

    pub fn get_search_path_key(&self) -> String {
        self.search_path_key
            .clone()
            .unwrap_or_else(|| DEFAULT_SEARCH_PATH_KEY.to_string())
    }

    pub fn get_repair_search_path(&self) -> bool {
        self.repair_search_path.unwrap_or(true)
    }

    pub fn get_python_home(&self) -> Option<PathBuf> {
        self.python_home
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    /// Entries of `python-path`, split the way the OS splits `PYTHONPATH`
    pub fn get_python_path(&self) -> Vec<PathBuf> {
        match self.python_path.as_deref() {
            Some(paths) if !paths.trim().is_empty() => std::env::split_paths(paths).collect(),
            _ => Vec::new(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    let base = dirs::home_dir().map(|home| home.join(".config"));

    #[cfg(target_os = "windows")]
    let base = dirs::config_dir();

    base.unwrap_or_else(|| PathBuf::from(".")).join("pyhost")
}
