//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use vanadristi_core::queries::DASHBOARD_REFETCH_INTERVAL;
use vanadristi_core::{CacheConfig, ClientConfig, DEFAULT_BASE_URL};

use crate::cli::{ConfigKey, OutputFormat};

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "VANADRISTI_CONFIG";

/// Longest dashboard refresh interval accepted, one day.
pub const MAX_REFETCH_INTERVAL_SECS: u64 = 86_400;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// API base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Seconds a cached response stays fresh
    #[serde(default)]
    pub stale_time: Option<u64>,

    /// Dashboard refresh interval in seconds
    #[serde(default)]
    pub refetch_interval: Option<u64>,

    /// Default output format ("text" or "json")
    #[serde(default)]
    pub format: Option<String>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,

    /// Plant used when a command needs one and none is given
    #[serde(default)]
    pub default_plant: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vanadristi")
            .join("config.toml")
    }

    /// Load config from file, or return default if not found
    pub fn load() -> Self {
        let path = Self::path();
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}", e);
                Self::default()
            }
        }
    }

    /// Load from `path`. A missing file is the default config.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// The config `config init` writes: every key at its built-in default.
    pub fn with_defaults() -> Self {
        let cache = CacheConfig::default();
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            timeout: Some(vanadristi_core::config::DEFAULT_TIMEOUT_SECS),
            stale_time: Some(cache.stale_time.as_secs()),
            refetch_interval: Some(DASHBOARD_REFETCH_INTERVAL.as_secs()),
            format: Some("text".to_string()),
            no_color: false,
            default_plant: None,
        }
    }

    /// Read one key as text.
    pub fn get(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::BaseUrl => self.base_url.clone(),
            ConfigKey::Timeout => self.timeout.map(|v| v.to_string()),
            ConfigKey::StaleTime => self.stale_time.map(|v| v.to_string()),
            ConfigKey::RefetchInterval => self.refetch_interval.map(|v| v.to_string()),
            ConfigKey::Format => self.format.clone(),
            ConfigKey::NoColor => Some(self.no_color.to_string()),
            ConfigKey::DefaultPlant => self.default_plant.clone(),
        }
    }

    /// Set one key from text, validating the value.
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        match key {
            ConfigKey::BaseUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    bail!("Invalid base URL '{}'. It must start with http:// or https://", value);
                }
                self.base_url = Some(value.trim_end_matches('/').to_string());
            }
            ConfigKey::Timeout => {
                let secs = parse_secs(value)?;
                if secs == 0 {
                    bail!("Timeout must be at least 1 second");
                }
                self.timeout = Some(secs);
            }
            ConfigKey::StaleTime => self.stale_time = Some(parse_secs(value)?),
            ConfigKey::RefetchInterval => {
                let secs = parse_secs(value)?;
                if !(1..=MAX_REFETCH_INTERVAL_SECS).contains(&secs) {
                    bail!(
                        "Refetch interval must be between 1 and {} seconds",
                        MAX_REFETCH_INTERVAL_SECS
                    );
                }
                self.refetch_interval = Some(secs);
            }
            ConfigKey::Format => {
                let format = value.to_lowercase();
                if format != "text" && format != "json" {
                    bail!("Invalid format '{}'. Valid values: text, json", value);
                }
                self.format = Some(format);
            }
            ConfigKey::NoColor => self.no_color = parse_bool(value)?,
            ConfigKey::DefaultPlant => {
                let id = value.trim();
                if id.is_empty() {
                    bail!("Plant id cannot be empty");
                }
                self.default_plant = Some(id.to_string());
            }
        }
        Ok(())
    }

    /// Remove one key so its default applies again.
    pub fn unset(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::BaseUrl => self.base_url = None,
            ConfigKey::Timeout => self.timeout = None,
            ConfigKey::StaleTime => self.stale_time = None,
            ConfigKey::RefetchInterval => self.refetch_interval = None,
            ConfigKey::Format => self.format = None,
            ConfigKey::NoColor => self.no_color = false,
            ConfigKey::DefaultPlant => self.default_plant = None,
        }
    }

    /// Client settings, with `base_url` (from the flag or env var) taking
    /// precedence over the file.
    pub fn client_config(&self, base_url: Option<&str>) -> ClientConfig {
        let url = base_url
            .map(str::to_string)
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut cache = CacheConfig::default();
        if let Some(secs) = self.stale_time {
            let stale = Duration::from_secs(secs);
            cache = cache.stale_time(stale).gc_time(cache.gc_time.max(stale));
        }

        let mut config = ClientConfig::new(url).cache(cache);
        if let Some(secs) = self.timeout {
            config = config.timeout_secs(secs);
        }
        config
    }

    /// Output format from the file, if it names a known one.
    pub fn output_format(&self) -> Option<OutputFormat> {
        match self.format.as_deref()?.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }

    /// Dashboard refresh interval: flag, then file, then the built-in 60 s.
    ///
    /// An out-of-range value from a hand-edited file falls back to the default.
    pub fn refetch_interval(&self, flag: Option<u64>) -> Duration {
        flag.or(self.refetch_interval)
            .filter(|secs| (1..=MAX_REFETCH_INTERVAL_SECS).contains(secs))
            .map(Duration::from_secs)
            .unwrap_or(DASHBOARD_REFETCH_INTERVAL)
    }
}

fn parse_secs(value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a valid number of seconds", value))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!(
            "Invalid boolean value '{}'. Use: true/false, yes/no, on/off, 1/0",
            value
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_flag_overrides_file() {
        let config = Config {
            base_url: Some("http://file.example/api/v1".to_string()),
            ..Default::default()
        };
        let client = config.client_config(Some("http://flag.example/api/v1"));
        assert_eq!(client.base_url, "http://flag.example/api/v1");

        let client = config.client_config(None);
        assert_eq!(client.base_url, "http://file.example/api/v1");
    }

    #[test]
    fn test_client_config_defaults() {
        let client = Config::default().client_config(None);
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.timeout(), Duration::from_secs(10));
        assert_eq!(client.cache, CacheConfig::default());
        assert!(client.validate().is_ok());
    }

    #[test]
    fn test_long_stale_time_keeps_config_valid() {
        let config = Config {
            stale_time: Some(900),
            ..Default::default()
        };
        let client = config.client_config(None);
        assert_eq!(client.cache.stale_time, Duration::from_secs(900));
        assert!(client.validate().is_ok());
    }

    #[test]
    fn test_set_validates_values() {
        let mut config = Config::default();
        assert!(config.set(ConfigKey::Timeout, "0").is_err());
        assert!(config.set(ConfigKey::Timeout, "soon").is_err());
        assert!(config.set(ConfigKey::Format, "csv").is_err());
        assert!(config.set(ConfigKey::BaseUrl, "ftp://x").is_err());

        config.set(ConfigKey::Timeout, "20").unwrap();
        config.set(ConfigKey::Format, "JSON").unwrap();
        config.set(ConfigKey::NoColor, "yes").unwrap();
        config.set(ConfigKey::BaseUrl, "http://localhost:8000/api/v1/").unwrap();

        assert_eq!(config.timeout, Some(20));
        assert_eq!(config.output_format(), Some(OutputFormat::Json));
        assert!(config.no_color);
        assert_eq!(config.get(ConfigKey::BaseUrl).as_deref(), Some("http://localhost:8000/api/v1"));
    }

    #[test]
    fn test_unset_restores_default() {
        let mut config = Config::default();
        config.set(ConfigKey::DefaultPlant, "p1").unwrap();
        config.unset(ConfigKey::DefaultPlant);
        assert_eq!(config.get(ConfigKey::DefaultPlant), None);
    }

    #[test]
    fn test_refetch_interval_precedence() {
        let config = Config {
            refetch_interval: Some(15),
            ..Default::default()
        };
        assert_eq!(config.refetch_interval(Some(5)), Duration::from_secs(5));
        assert_eq!(config.refetch_interval(None), Duration::from_secs(15));
        assert_eq!(
            Config::default().refetch_interval(None),
            DASHBOARD_REFETCH_INTERVAL
        );
    }

    #[test]
    fn test_refetch_interval_is_bounded() {
        let mut config = Config::default();
        assert!(config.set(ConfigKey::RefetchInterval, "0").is_err());
        assert!(config.set(ConfigKey::RefetchInterval, "86401").is_err());
        assert!(
            config
                .set(ConfigKey::RefetchInterval, "18446744073709551615")
                .is_err()
        );
        config.set(ConfigKey::RefetchInterval, "86400").unwrap();
        assert_eq!(config.refetch_interval, Some(86_400));

        let edited = Config {
            refetch_interval: Some(u64::MAX),
            ..Default::default()
        };
        assert_eq!(edited.refetch_interval(None), DASHBOARD_REFETCH_INTERVAL);
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::with_defaults();
        config.default_plant = Some("p7".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timeout = \"soon\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
