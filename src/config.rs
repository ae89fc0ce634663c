//! Runtime configuration loaded from YAML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::folders::{DesiredState, FolderSpec};

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_STARTUP_DELAY_MS: u64 = 1000;
pub const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("duplicate folder id: '{0}'")]
    DuplicateFolder(String),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Gsettings,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub debounce_ms: u64,
    pub startup_delay_ms: u64,
    pub backend: StoreBackend,
    pub gsettings_bin: PathBuf,
    pub application_dirs: Vec<PathBuf>,
    /// Replaces the built-in folder table when set.
    pub folders: Option<Vec<FolderSpec>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            startup_delay_ms: DEFAULT_STARTUP_DELAY_MS,
            backend: StoreBackend::default(),
            gsettings_bin: PathBuf::from("gsettings"),
            application_dirs: default_application_dirs(),
            folders: None,
        }
    }
}

impl AppConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Loads the per-user config file, or defaults when there is none.
    pub fn load_default() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid("debounce_ms must be positive".to_string()));
        }
        self.desired_state().map(|_| ())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn desired_state(&self) -> Result<DesiredState, ConfigError> {
        match &self.folders {
            Some(folders) => DesiredState::new(folders.clone()),
            None => Ok(DesiredState::builtin()),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "gnome", "app-folders")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// System, flatpak and per-user `applications` directories.
pub fn default_application_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/applications"),
        PathBuf::from("/usr/local/share/applications"),
        PathBuf::from("/var/lib/flatpak/exports/share/applications"),
    ];
    if let Some(base) = directories::BaseDirs::new() {
        dirs.push(base.data_local_dir().join("applications"));
        dirs.push(base.data_local_dir().join("flatpak/exports/share/applications"));
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.startup_delay(), Duration::from_secs(1));
        assert_eq!(config.backend, StoreBackend::Gsettings);
        assert_eq!(config.desired_state().unwrap().len(), 13);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml("debounce_ms: 250\nbackend: memory\n").unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.startup_delay_ms, DEFAULT_STARTUP_DELAY_MS);
        assert!(config.folders.is_none());
    }

    #[test]
    fn test_custom_folders_replace_builtin() {
        let yaml = r#"
folders:
  - id: games
    name: Games
    categories: [Game]
  - id: dev
    name: Development
    categories: [Development, IDE]
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        let state = config.desired_state().unwrap();
        assert_eq!(state.folder_ids(), vec!["games", "dev"]);
        assert_eq!(state.get("dev").unwrap().categories, vec!["Development", "IDE"]);
    }

    #[test]
    fn test_duplicate_folder_ids_are_rejected() {
        let yaml = r#"
folders:
  - { id: games, name: Games, categories: [Game] }
  - { id: games, name: Other, categories: [Game] }
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateFolder(_)));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(AppConfig::from_yaml("debounce_ms: 0\n").is_err());
        assert!(AppConfig::from_yaml("backend: registry\n").is_err());
        let bad_id = "folders:\n  - { id: 'a/b', name: X, categories: [] }\n";
        assert!(matches!(
            AppConfig::from_yaml(bad_id),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"startup_delay_ms: 0\n").unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.startup_delay(), Duration::ZERO);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = AppConfig::load(Path::new("/nonexistent/app-folders.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
