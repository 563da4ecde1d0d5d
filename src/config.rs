use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::{Result, SwiftKeysError};
use crate::stats::AccuracyWeighting;
use crate::COUNTDOWN_SECS;

const MAX_COMPETITORS: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub countdown_secs: u8,
    pub competitors: Vec<String>,
    pub accuracy_weighting: AccuracyWeighting,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            countdown_secs: COUNTDOWN_SECS,
            competitors: vec!["AI Player 1".to_string(), "AI Player 2".to_string()],
            accuracy_weighting: AccuracyWeighting::default(),
            seed: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.competitors.len() > MAX_COMPETITORS {
            return Err(SwiftKeysError::Config(format!(
                "at most {MAX_COMPETITORS} competitors are supported, got {}",
                self.competitors.len()
            )));
        }
        if self.competitors.iter().any(|name| name.trim().is_empty()) {
            return Err(SwiftKeysError::Config(
                "competitor names must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("swiftkeys_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable config"),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
