//! Configuration file support for the consultation terminal.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/supervise/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub doctor: DoctorConfig,

    #[serde(default)]
    pub advisor: AdvisorConfig,
}

/// Registry storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Doctor running this workstation
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct DoctorConfig {
    /// Membership number given to newly enrolled patients
    #[serde(default)]
    pub membership_number: u32,
}

/// Scripted advisor configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Canned answer to serve instead of the built-in one
    #[serde(default)]
    pub response_file: Option<PathBuf>,

    #[serde(default = "default_min_prompt_words")]
    pub min_prompt_words: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            response_file: None,
            min_prompt_words: default_min_prompt_words(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(std::env::temp_dir);
    base.join("supervise")
}

fn default_min_prompt_words() -> usize {
    2
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(std::env::temp_dir);
        base.join("supervise").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.advisor.min_prompt_words == 0 {
            return Err(Error::Config(
                "advisor.min_prompt_words must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.doctor.membership_number, 0);
        assert_eq!(config.advisor.min_prompt_words, 2);
        assert!(config.advisor.response_file.is_none());
        assert!(config.data.data_dir.ends_with("supervise"));
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.doctor.membership_number = 4321;
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.doctor.membership_number, 4321);
        assert_eq!(parsed.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[advisor]
min_prompt_words = 4
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.advisor.min_prompt_words, 4);
        assert_eq!(config.doctor.membership_number, 0); // default
    }

    #[test]
    fn test_zero_prompt_words_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[advisor]\nmin_prompt_words = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
