use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "keybomb";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }

    /// Persisted session history, falling back to the working directory
    pub fn history_path() -> PathBuf {
        Self::project()
            .map(|pd| pd.data_local_dir().join("history.json"))
            .unwrap_or_else(|| PathBuf::from("keybomb_history.json"))
    }

    pub fn config_path() -> PathBuf {
        Self::project()
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("keybomb_config.json"))
    }

    pub fn log_path() -> PathBuf {
        Self::project()
            .map(|pd| pd.data_local_dir().join("keybomb.log"))
            .unwrap_or_else(|| PathBuf::from("keybomb.log"))
    }
}
