//! Defines the central, mutable state of the application.

use std::path::PathBuf;

use crate::config::AppConfig;
use crate::core::{FileRegistry, PreviewGenerator, ViewStateSynchronizer};

/// Holds the complete, mutable state of the upload view.
///
/// This struct is wrapped in an `Arc<Mutex<...>>` and shared between the IPC
/// handlers, preview tasks, and the analysis pass. The lock is never held
/// across an `.await`.
pub struct AppState {
    /// The application's configuration settings.
    pub config: AppConfig,
    /// Where `config` is persisted. `None` uses the platform location.
    pub config_path: Option<PathBuf>,
    /// Every selected file, in selection order.
    pub registry: FileRegistry,
    /// `true` from the start of an analysis pass until all its requests settled.
    pub is_uploading: bool,
    /// The shareable "result available" annotation.
    pub view: ViewStateSynchronizer,
    /// Produces local previews for new selections.
    pub previews: PreviewGenerator,
}

impl Default for AppState {
    /// Creates a default `AppState` instance, loading the configuration from disk.
    fn default() -> Self {
        Self::new(AppConfig::load().unwrap_or_default())
    }
}

impl AppState {
    /// Creates the state for a view opened at the configured page path.
    pub fn new(config: AppConfig) -> Self {
        let location = config.page_path.clone();
        Self::with_location(config, &location)
    }

    /// Creates the state for a view opened at `location`, which may already
    /// carry the result flag.
    pub fn with_location(config: AppConfig, location: &str) -> Self {
        let previews = match &config.preview_directory {
            Some(dir) => PreviewGenerator::new(dir),
            None => PreviewGenerator::default(),
        };
        let view = ViewStateSynchronizer::from_location(location, &config.result_flag_key);

        Self {
            config,
            config_path: None,
            registry: FileRegistry::new(),
            is_uploading: false,
            view,
            previews,
        }
    }

    /// Clears every selection and the result annotation. Requests still in
    /// flight keep running; their results find no item to update.
    ///
    /// Returns `true` if the shareable location changed.
    pub fn reset_upload_state(&mut self) -> bool {
        tracing::info!("Resetting upload view");
        self.view.reset(&mut self.registry)
    }

    /// Persists the configuration, logging instead of failing.
    pub fn persist_config(&self) {
        if let Err(e) =
            crate::config::settings::save_config(&self.config, self.config_path.as_deref())
        {
            tracing::warn!("Failed to save config: {}", e);
        }
    }
}
