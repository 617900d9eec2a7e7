use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

/// Environment variable that overrides the API key stored on disk.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_UNITS: &str = "metric";
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// api_key = "..."
/// debounce_ms = 300
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenWeather credential, sent as `appid` on every request.
    pub api_key: Option<String>,

    /// Host serving both `/geo/1.0/direct` and `/data/2.5/weather`.
    pub base_url: String,

    pub units: String,

    /// Pause before a suggestion request is sent; 0 disables it.
    pub debounce_ms: u64,

    /// Location of the persisted search history. Defaults to the platform data dir.
    pub history_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            units: DEFAULT_UNITS.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            history_file: None,
        }
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            // First run: no config file.
            Self::default()
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            cfg.apply_env_api_key(key);
        }

        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid weather configuration")
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the history file, honoring an explicit `history_file` override.
    pub fn history_file_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.history_file {
            return Ok(path.clone());
        }
        Ok(Self::project_dirs()?.data_dir().join("history.json"))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Returns the API key, or an error telling the user how to set one.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `weather configure` or set {API_KEY_ENV}."
            )
        })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn apply_env_api_key(&mut self, key: String) {
        if !key.trim().is_empty() {
            self.api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_api_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.require_api_key().unwrap_err();

        assert!(err.to_string().contains("No API key configured"));
        assert!(err.to_string().contains("weather configure"));
    }

    #[test]
    fn empty_api_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.set_api_key(String::new());
        assert!(cfg.require_api_key().is_err());
    }

    #[test]
    fn set_api_key_is_returned() {
        let mut cfg = Config::default();
        cfg.set_api_key("OPEN_KEY".into());
        assert_eq!(cfg.require_api_key().expect("key must exist"), "OPEN_KEY");
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg = Config::from_toml("api_key = \"abc\"\ndebounce_ms = 0\n").expect("valid toml");

        assert_eq!(cfg.api_key.as_deref(), Some("abc"));
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.units, DEFAULT_UNITS);
        assert_eq!(cfg.debounce(), Duration::ZERO);
        assert_eq!(cfg.history_file, None);
    }

    #[test]
    fn toml_roundtrip_keeps_values() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());
        cfg.history_file = Some(PathBuf::from("/tmp/history.json"));

        let text = toml::to_string_pretty(&cfg).expect("serializable");
        let parsed = Config::from_toml(&text).expect("parsable");

        assert_eq!(parsed.api_key.as_deref(), Some("KEY"));
        assert_eq!(parsed.history_file_path().expect("explicit path"), PathBuf::from("/tmp/history.json"));
        assert_eq!(parsed.debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn blank_env_key_does_not_clear_file_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("FILE_KEY".into());
        cfg.apply_env_api_key("  ".into());
        assert_eq!(cfg.api_key.as_deref(), Some("FILE_KEY"));

        cfg.apply_env_api_key("ENV_KEY".into());
        assert_eq!(cfg.api_key.as_deref(), Some("ENV_KEY"));
    }
}
