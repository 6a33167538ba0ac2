use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::errors::{BillingError, Result};
use crate::ledger::PeriodKind;
use crate::utils::{app_data_dir, ensure_dir, write_atomic};

const CONFIG_FILE: &str = "config.json";
const DEFAULT_LEDGER_FILE: &str = "ledger.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BillingConfig {
    /// Period kind preselected when a session starts.
    #[serde(default)]
    pub default_period: PeriodKind,
    /// Location of the JSON ledger book; relative paths resolve against the base dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_file: Option<PathBuf>,
    /// Extra tracing directive, e.g. `dairy_billing=debug`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            default_period: PeriodKind::Monthly,
            ledger_file: None,
            log_filter: None,
        }
    }
}

pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        let path = base.join(CONFIG_FILE);
        Ok(Self { base, path })
    }

    pub fn load(&self) -> Result<BillingConfig> {
        if !self.path.exists() {
            return Ok(BillingConfig::default());
        }
        let data = fs::read_to_string(&self.path)?;
        serde_json::from_str(&data).map_err(|err| {
            BillingError::Config(format!("{}: {}", self.path.display(), err))
        })
    }

    pub fn save(&self, config: &BillingConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)
    }

    /// Absolute path of the JSON ledger book for `config`.
    pub fn ledger_path(&self, config: &BillingConfig) -> PathBuf {
        match &config.ledger_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.base.join(path),
            None => self.base.join(DEFAULT_LEDGER_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_defaults() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        assert_eq!(manager.load().unwrap(), BillingConfig::default());
    }

    #[test]
    fn save_then_load_keeps_settings() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let config = BillingConfig {
            default_period: PeriodKind::Fortnightly,
            ledger_file: Some(PathBuf::from("books/main.json")),
            log_filter: Some("dairy_billing=debug".into()),
        };
        manager.save(&config).unwrap();
        assert_eq!(manager.load().unwrap(), config);
        assert_eq!(
            manager.ledger_path(&config),
            temp.path().join("books/main.json")
        );
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        fs::write(manager.path(), "{\"default_period\": \"weekly\"}").unwrap();
        assert!(matches!(manager.load(), Err(BillingError::Config(_))));
    }

    #[test]
    fn default_ledger_lives_in_base_dir() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        assert_eq!(
            manager.ledger_path(&BillingConfig::default()),
            temp.path().join("ledger.json")
        );
    }
}
