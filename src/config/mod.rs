pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::session::DEFAULT_TOKEN_ENV;
use crate::core::view_state::RESULT_FLAG;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Inference endpoint receiving one multipart upload per image.
    pub endpoint_url: String,
    /// Per-request timeout. `None` waits as long as the endpoint needs.
    pub request_timeout_secs: Option<u64>,
    /// Environment variable holding the bearer token.
    pub auth_token_env: String,
    /// Location of the upload view, used for the shareable result link.
    pub page_path: String,
    pub result_flag_key: String,
    /// Where previews are written. `None` uses the system temp directory.
    pub preview_directory: Option<PathBuf>,
    pub last_directory: Option<PathBuf>,
    /// Where the CLI writes result overlays. `None` writes nothing.
    pub output_directory: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        settings::load_config(None)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://localhost:8000/predict".to_string(),
            request_timeout_secs: None,
            auth_token_env: DEFAULT_TOKEN_ENV.to_string(),
            page_path: "/uploadpage".to_string(),
            result_flag_key: RESULT_FLAG.to_string(),
            preview_directory: None,
            last_directory: None,
            output_directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_write_no_overlays() {
        let config = AppConfig::default();
        assert!(config.output_directory.is_none());
        assert_eq!(config.endpoint_url, "http://localhost:8000/predict");
        assert!(config.request_timeout_secs.is_none());
    }

    #[test]
    fn test_config_without_output_directory_keeps_it_unset() {
        let config: AppConfig =
            serde_json::from_str(r#"{"page_path": "/analysis"}"#).unwrap();
        assert_eq!(config.page_path, "/analysis");
        assert!(config.output_directory.is_none());
    }
}
