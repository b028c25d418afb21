//! Configuration file handling.
//!
//! The configuration file is stored at `$LEDGER_LENS_HOME/config.json`. It names the master
//! currency reports are expressed in, where exchange rates are fetched from, and where the data
//! file and the local rate-table cache live.

use crate::rates::DEFAULT_STALE_AFTER_HOURS;
use crate::{utils, Result};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "ledger-lens";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const DATA_JSON: &str = "data.json";
const RATES: &str = "rates";
const MASTER_CURRENCY: &str = "USD";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$LEDGER_LENS_HOME` and from there it loads `$LEDGER_LENS_HOME/config.json`. It
/// provides paths to other items that are either configurable or are expected in a certain
/// location within the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory, the rate cache directory and an initial `config.json` that
    /// points at `rate_source_url`.
    ///
    /// # Errors
    /// - Returns an error if any file operations fail or if a config file already exists.
    pub async fn create(dir: impl Into<PathBuf>, rate_source_url: &str) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the ledger-lens home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            let e = anyhow!("A config file already exists at '{}'", config_path.display());
            return Err(e.into());
        }

        let config_file = ConfigFile {
            rate_source_url: rate_source_url.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        let config = Self {
            root,
            config_path,
            config_file,
        };
        utils::make_dir(&config.rates_dir()).await?;
        Ok(config)
    }

    /// Validates that the home directory and its config file exist, then loads the config.
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The ledger-lens home directory is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            let e = anyhow!("The config file is missing '{}'", config_path.display());
            return Err(e.into());
        }
        let config_file = ConfigFile::load(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn master_currency(&self) -> &str {
        &self.config_file.master_currency
    }

    pub fn rate_source_url(&self) -> &str {
        &self.config_file.rate_source_url
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.config_file.stale_after_hours))
    }

    /// The JSON snapshot holding accounts, categories, operations and watches.
    pub fn data_path(&self) -> PathBuf {
        self.resolve(self.config_file.data_path())
    }

    /// The directory holding one JSON file per cached rate table.
    pub fn rates_dir(&self) -> PathBuf {
        self.resolve(self.config_file.rates_dir())
    }

    /// Returns `p` unchanged if it is absolute, otherwise joins it to the home directory.
    fn resolve(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "ledger-lens",
///   "config_version": 1,
///   "master_currency": "EUR",
///   "rate_source_url": "https://rates.example.com/v1",
///   "stale_after_hours": 6,
///   "data_path": "data.json",
///   "rates_dir": "rates"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "ledger-lens"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The currency reports are converted into
    #[serde(default = "default_master_currency")]
    master_currency: String,

    /// Base URL of the exchange rate source
    rate_source_url: String,

    /// Hours before a partially published rate table is fetched again
    #[serde(default = "default_stale_after_hours")]
    stale_after_hours: u32,

    /// Path to the data file (optional, relative to the home directory or absolute)
    #[serde(skip_serializing_if = "Option::is_none")]
    data_path: Option<PathBuf>,

    /// Path to the rate table cache (optional, relative to the home directory or absolute)
    #[serde(skip_serializing_if = "Option::is_none")]
    rates_dir: Option<PathBuf>,
}

fn default_master_currency() -> String {
    MASTER_CURRENCY.to_string()
}

fn default_stale_after_hours() -> u32 {
    DEFAULT_STALE_AFTER_HOURS as u32
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            master_currency: default_master_currency(),
            rate_source_url: String::new(),
            stale_after_hours: default_stale_after_hours(),
            data_path: None,
            rates_dir: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from `path` and checks that it belongs to this app.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        if config.app_name != APP_NAME {
            return Err(anyhow!(
                "Invalid app_name in config file: expected '{}', got '{}'",
                APP_NAME,
                config.app_name
            )
            .into());
        }

        Ok(config)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")?;
        Ok(())
    }

    pub fn data_path(&self) -> PathBuf {
        self.data_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DATA_JSON))
    }

    pub fn rates_dir(&self) -> PathBuf {
        self.rates_dir.clone().unwrap_or_else(|| PathBuf::from(RATES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("lens_home");
        let url = "https://rates.example.com/v1";

        let config = Config::create(&home_dir, url).await.unwrap();

        assert_eq!(url, config.rate_source_url());
        assert_eq!("USD", config.master_currency());
        assert_eq!(config.stale_after(), chrono::Duration::hours(6));
        assert!(config.config_path().is_file());
        assert!(config.rates_dir().is_dir());
        assert_eq!(config.data_path(), config.root().join(DATA_JSON));

        let loaded = Config::load(&home_dir).await.unwrap();
        assert_eq!(loaded.rate_source_url(), url);
    }

    #[tokio::test]
    async fn test_config_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        Config::create(dir.path(), "https://a.example.com").await.unwrap();
        assert!(Config::create(dir.path(), "https://b.example.com")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_config_load_missing_home() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(dir.path().join("nope")).await.is_err());
        assert!(Config::load(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "ledger-lens",
            "config_version": 1,
            "rate_source_url": "https://rates.example.com"
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config.master_currency, "USD");
        assert_eq!(config.stale_after_hours, 6);
        assert_eq!(config.data_path(), PathBuf::from(DATA_JSON));
        assert_eq!(config.rates_dir(), PathBuf::from(RATES));
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "budget-sync",
            "config_version": 1,
            "rate_source_url": "https://rates.example.com"
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let result = ConfigFile::load(&config_path).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let original = ConfigFile {
            master_currency: "EUR".to_string(),
            rate_source_url: "https://rates.example.com".to_string(),
            stale_after_hours: 2,
            data_path: Some(PathBuf::from("/var/lib/lens/data.json")),
            ..ConfigFile::default()
        };
        original.save(&config_path).await.unwrap();
        assert_eq!(original, ConfigFile::load(&config_path).await.unwrap());
    }

    #[test]
    fn test_config_file_serialization_omits_none_fields() {
        let json = serde_json::to_string(&ConfigFile::default()).unwrap();
        assert!(!json.contains("data_path"));
        assert!(!json.contains("rates_dir"));
    }

    #[tokio::test]
    async fn test_absolute_paths_are_kept() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::create(dir.path(), "https://a.example.com")
            .await
            .unwrap();
        let elsewhere = dir.path().join("elsewhere").join("data.json");
        config.config_file.data_path = Some(elsewhere.clone());
        assert_eq!(config.data_path(), elsewhere);
    }
}
