//! An abstraction layer for native file dialogs to enable testing.

use std::path::{Path, PathBuf};

use crate::utils::file_detection::image_extensions;

/// Defines a common interface for image selection dialogs.
/// This allows for a mock implementation during tests, avoiding the need
/// to interact with actual OS dialog windows.
pub trait DialogService: Send + Sync {
    /// Opens a dialog to select one or more images. An empty list means the
    /// user cancelled.
    fn pick_images(&self, start_directory: Option<&Path>) -> Vec<PathBuf>;

    /// Opens a dialog to select a single file for config import.
    fn pick_config_to_import(&self) -> Option<PathBuf>;

    /// Opens a dialog to select a save location for a config export.
    fn export_config_path(&self) -> Option<PathBuf>;
}

/// The production implementation that uses the `rfd` crate to show native OS dialogs.
pub struct NativeDialogService;

impl DialogService for NativeDialogService {
    fn pick_images(&self, start_directory: Option<&Path>) -> Vec<PathBuf> {
        let mut dialog = rfd::FileDialog::new()
            .set_title("Select images to analyze")
            .add_filter("Images", image_extensions());
        match start_directory {
            Some(dir) => dialog = dialog.set_directory(dir),
            None => {
                if let Some(pictures) = dirs::picture_dir() {
                    dialog = dialog.set_directory(pictures);
                }
            }
        }
        dialog.pick_files().unwrap_or_default()
    }

    fn pick_config_to_import(&self) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
    }

    fn export_config_path(&self) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name("fundus-upload-config.json")
            .save_file()
    }
}
