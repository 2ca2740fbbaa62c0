//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/tally/config.toml)
//! 3. Environment variables (TALLY_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::report::DEFAULT_CURRENCY;
use crate::storage::{StorageKeys, DEFAULT_NAMESPACE};

/// Environment variable prefix
const ENV_PREFIX: &str = "TALLY";

/// Keys accepted by [`Config::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "data_dir",
    "namespace",
    "currency_symbol",
    "utc_offset",
    "log_level",
    "log_file",
];

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory holding one JSON file per storage key
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Prefix of every storage key
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Symbol printed before amounts
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// Offset used to split expenses into calendar days, e.g. "+05:30"
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    /// Default log filter level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            namespace: default_namespace(),
            currency_symbol: default_currency(),
            utc_offset: default_utc_offset(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (TALLY_DATA_DIR, TALLY_NAMESPACE, ...)
    /// 2. Config file (~/.config/tally/config.toml or TALLY_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_NAMESPACE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.namespace = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_CURRENCY", ENV_PREFIX)) {
            self.currency_symbol = val;
        }

        if let Ok(val) = std::env::var(format!("{}_UTC_OFFSET", ENV_PREFIX)) {
            self.utc_offset = val;
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.log_level = val;
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Change one setting by name, validating the value
    ///
    /// `none` or an empty value clears `log_file`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "namespace" => {
                if value.is_empty() {
                    bail!("namespace cannot be empty");
                }
                self.namespace = value.to_string();
            }
            "currency_symbol" => self.currency_symbol = value.to_string(),
            "utc_offset" => {
                parse_offset(value)?;
                self.utc_offset = value.to_string();
            }
            "log_level" => self.log_level = value.to_string(),
            "log_file" => {
                self.log_file = if value.is_empty() || value == "none" {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            _ => bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with TALLY_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tally")
            .join("config.toml")
    }

    /// Storage keys for the configured namespace
    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::new(&self.namespace)
    }

    /// The configured UTC offset
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_offset(&self.utc_offset)
    }
}

/// Parse `+HH:MM`, `-HH:MM` or `+HH`
fn parse_offset(value: &str) -> Result<FixedOffset> {
    let invalid = || anyhow::anyhow!("Invalid UTC offset '{}'. Use a form like +05:30", value);

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "TALLY_CONFIG",
        "TALLY_DATA_DIR",
        "TALLY_NAMESPACE",
        "TALLY_CURRENCY",
        "TALLY_UTC_OFFSET",
        "TALLY_LOG_LEVEL",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.namespace, "expense_tracker");
        assert_eq!(config.currency_symbol, "₹");
        assert_eq!(config.log_level, "warn");
        assert!(config.log_file.is_none());
        assert!(config.data_dir.ends_with("tally"));
        assert_eq!(config.offset().unwrap(), FixedOffset::east_opt(0).unwrap());
    }

    #[test]
    fn test_storage_keys_follow_namespace() {
        let config = Config {
            namespace: "demo".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.storage_keys().key(crate::storage::Collection::Expenses),
            "@demo_expenses"
        );
    }

    #[test]
    fn test_env_overrides() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("TALLY_DATA_DIR", "/tmp/tally-test");
        env::set_var("TALLY_NAMESPACE", "scratch");
        env::set_var("TALLY_CURRENCY", "$");
        env::set_var("TALLY_LOG_LEVEL", "debug");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/tally-test"));
        assert_eq!(config.namespace, "scratch");
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_empty_namespace_override_is_ignored() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("TALLY_NAMESPACE", "");
        config.apply_env_overrides();

        assert_eq!(config.namespace, "expense_tracker");
    }

    #[test]
    fn test_set_values() {
        let mut config = Config::default();

        config.set("currency_symbol", "€").unwrap();
        config.set("utc_offset", "+05:30").unwrap();
        config.set("log_file", "/tmp/tally.log").unwrap();

        assert_eq!(config.currency_symbol, "€");
        assert_eq!(
            config.offset().unwrap(),
            FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
        );
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/tally.log")));

        config.set("log_file", "none").unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = Config::default();

        assert!(config.set("favorite_tag", "x").is_err());
        assert!(config.set("utc_offset", "India").is_err());
        assert!(config.set("namespace", "").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            namespace = "household"
            currency_symbol = "$"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.namespace, "household");
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let config = Config {
            data_dir: temp.path().join("data"),
            namespace: "household".to_string(),
            log_file: Some(temp.path().join("tally.log")),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded, config);
        assert!(temp.path().join("data").exists());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp = TempDir::new().unwrap();
        env::set_var("TALLY_DATA_DIR", temp.path().join("data"));

        let path = temp.path().join("missing.toml");
        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.namespace, "expense_tracker");
        assert_eq!(config.data_dir, temp.path().join("data"));
    }
}
