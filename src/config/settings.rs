use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use super::AppConfig;

const APP_NAME: &str = "FundusUpload";
const CONFIG_FILE: &str = "config.json";

/// Returns the platform-specific configuration directory for the application.
pub fn get_config_directory() -> Option<PathBuf> {
    ProjectDirs::from("com", "fundusupload", APP_NAME)
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Returns the full path to the configuration file.
pub fn get_config_file_path() -> Option<PathBuf> {
    get_config_directory().map(|dir| dir.join(CONFIG_FILE))
}

fn resolve_config_path(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => {
            get_config_file_path().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
        }
    }
}

/// Loads the application configuration.
///
/// `config_path` overrides the platform location. A missing file is created
/// with defaults. A corrupted file logs a warning and yields the defaults
/// instead of failing.
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig> {
    let config_path = resolve_config_path(config_path)?;

    if !config_path.exists() {
        tracing::info!(
            "Config file not found, creating default config at {:?}",
            config_path
        );
        let default_config = AppConfig::default();
        save_config(&default_config, Some(config_path.as_path()))?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file {:?}", config_path))?;

    match serde_json::from_str::<AppConfig>(&config_content) {
        Ok(config) => {
            tracing::info!("Loaded config from {:?}", config_path);
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse config file at {:?}: {}. Falling back to default config.",
                config_path,
                e
            );
            Ok(AppConfig::default())
        }
    }
}

/// Saves the provided configuration, creating the directory if needed.
pub fn save_config(config: &AppConfig, config_path: Option<&Path>) -> Result<()> {
    let config_path = resolve_config_path(config_path)?;

    if let Some(config_dir) = config_path.parent() {
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }
    }

    let config_json = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, config_json)?;
    tracing::info!("Saved config to {:?}", config_path);

    Ok(())
}

/// Exports the current configuration to a user-specified JSON file.
pub fn export_config(config: &AppConfig, export_path: &Path) -> Result<()> {
    let config_json = serde_json::to_string_pretty(config)?;
    fs::write(export_path, config_json)?;
    tracing::info!("Exported config to {:?}", export_path);
    Ok(())
}

/// Imports a configuration from a user-specified JSON file. Unlike
/// `load_config`, a malformed file is an error.
pub fn import_config(import_path: &Path) -> Result<AppConfig> {
    let config_content = fs::read_to_string(import_path)
        .with_context(|| format!("Failed to read {:?}", import_path))?;
    let config = serde_json::from_str::<AppConfig>(&config_content)
        .with_context(|| format!("Invalid config in {:?}", import_path))?;
    tracing::info!("Imported config from {:?}", import_path);
    Ok(config)
}

// Platform-specific configuration paths for reference:
// macOS:   ~/Library/Application Support/com.fundusupload.FundusUpload/
// Linux:   ~/.config/fundusupload/
// Windows: %APPDATA%/fundusupload/FundusUpload/config/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_helpers::setup_test_logging;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        setup_test_logging();
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = AppConfig {
            endpoint_url: "https://inference.example/predict".into(),
            request_timeout_secs: Some(45),
            last_directory: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        save_config(&config, Some(path.as_path())).unwrap();
        assert_eq!(load_config(Some(path.as_path())).unwrap(), config);
    }

    #[test]
    fn test_corrupted_config_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ this is not json").unwrap();

        assert_eq!(load_config(Some(path.as_path())).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_partial_config_fills_missing_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"endpoint_url": "http://10.0.0.5:8000/predict"}"#).unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.endpoint_url, "http://10.0.0.5:8000/predict");
        assert_eq!(config.page_path, AppConfig::default().page_path);
    }

    #[test]
    fn test_export_and_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exported.json");
        let config = AppConfig {
            page_path: "/analysis".into(),
            ..Default::default()
        };

        export_config(&config, &path).unwrap();
        assert_eq!(import_config(&path).unwrap(), config);

        fs::write(&path, "not json at all").unwrap();
        assert!(import_config(&path).is_err());
    }
}
