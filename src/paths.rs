//! Config and data file locations.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{LOG_FILE, SETTINGS_FILE};

/// Application directory name under the platform config/data dirs
const APP_DIR: &str = "sfmsock";

/// Environment override for the config directory
pub const ENV_CONFIG_DIR: &str = "SFMSOCK_CONFIG_DIR";

/// Configuration for overriding default application paths
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Create PathConfig from CLI arguments and environment variables
    ///
    /// Priority: CLI args → ENV var (SFMSOCK_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var(ENV_CONFIG_DIR).ok().map(PathBuf::from));

        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. SFMSOCK_CONFIG_DIR environment variable
/// 3. Local folder IF any sfmsock files exist (sfmsock.json, sfmsock.log)
/// 4. Platform-specific config directory from dirs-next (default)
///
/// Platform paths:
/// - Linux: ~/.config/sfmsock/{name}
/// - macOS: ~/Library/Application Support/sfmsock/{name}
/// - Windows: %APPDATA%\sfmsock\{name}
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_config_dir(config).join(name)
}

/// Get path to a data file (logs)
///
/// Same priority as [`config_file`], with the platform data directory as
/// the default:
/// - Linux: ~/.local/share/sfmsock/{name}
/// - macOS: ~/Library/Application Support/sfmsock/{name}
/// - Windows: %APPDATA%\sfmsock\{name}
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    get_data_dir(config).join(name)
}

/// Ensure that configuration and data directories exist
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = get_config_dir(config);
    let data_dir = get_data_dir(config);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    }

    // Only create data_dir if it's different from config_dir
    if data_dir != config_dir && !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }

    Ok(())
}

/// Check if any sfmsock files exist in the given directory
fn has_local_config_files(dir: &Path) -> bool {
    [SETTINGS_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}

fn local_dir() -> Option<PathBuf> {
    std::env::current_dir().ok().filter(|dir| has_local_config_files(dir))
}

/// Get the configuration directory
fn get_config_dir(config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Some(dir) = local_dir() {
        return dir;
    }
    dirs_next::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the data directory
fn get_data_dir(config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Some(dir) = local_dir() {
        return dir;
    }
    dirs_next::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_with_custom_dir() {
        let config = PathConfig {
            config_dir: Some(PathBuf::from("/custom")),
        };

        assert_eq!(config_file("sfmsock.json", &config), PathBuf::from("/custom/sfmsock.json"));
        assert_eq!(data_file("sfmsock.log", &config), PathBuf::from("/custom/sfmsock.log"));
    }

    #[test]
    fn test_cli_dir_beats_env() {
        let config = PathConfig::from_env_and_cli(Some(PathBuf::from("/from-cli")));
        assert_eq!(config.config_dir, Some(PathBuf::from("/from-cli")));
    }

    #[test]
    fn test_local_files_detected() {
        let dir = std::env::temp_dir().join(format!("sfmsock_paths_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        assert!(!has_local_config_files(&dir));
        std::fs::write(dir.join(LOG_FILE), "").unwrap();
        assert!(has_local_config_files(&dir));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_ensure_dirs_creates_custom_dir() {
        let dir = std::env::temp_dir()
            .join(format!("sfmsock_paths_{}", uuid::Uuid::new_v4()))
            .join("nested");
        let config = PathConfig {
            config_dir: Some(dir.clone()),
        };

        ensure_dirs(&config).unwrap();
        assert!(dir.is_dir());

        if let Some(parent) = dir.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}
