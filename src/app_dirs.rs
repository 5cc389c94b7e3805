use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "studytype";

/// Centralized application directory resolution
#[derive(Debug, Clone)]
pub struct AppDirs {
    state_dir: PathBuf,
    config_dir: PathBuf,
}

impl AppDirs {
    /// Platform locations: state under `$HOME/.local/state/studytype`,
    /// settings under the platform config dir.
    pub fn resolve() -> Self {
        let project = ProjectDirs::from("", "", APP_NAME);

        let state_dir = if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home).join(".local").join("state").join(APP_NAME)
        } else if let Some(pd) = &project {
            pd.data_local_dir().to_path_buf()
        } else {
            PathBuf::from(".").join(APP_NAME)
        };

        let config_dir = project
            .as_ref()
            .map(|pd| pd.config_dir().to_path_buf())
            .unwrap_or_else(|| state_dir.clone());

        Self {
            state_dir,
            config_dir,
        }
    }

    /// Everything under one directory.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            state_dir: dir.clone(),
            config_dir: dir,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.state_dir.join("studytype.db")
    }

    pub fn log_path(&self) -> PathBuf {
        self.state_dir.join("studytype.log")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}
