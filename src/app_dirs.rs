use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "swiftkeys";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/swiftkeys` when `HOME` is set, else the platform data dir.
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|pd| pd.config_dir().join("config.json"))
    }

    pub fn store_path() -> Option<PathBuf> {
        Self::state_dir().map(|d| d.join("store.json"))
    }

    pub fn results_path() -> Option<PathBuf> {
        Self::state_dir().map(|d| d.join("results.csv"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|d| d.join("swiftkeys.log"))
    }
}
