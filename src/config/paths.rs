//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\moonshine-stt\
//!   macOS:   ~/Library/Application Support/moonshine-stt/
//!   Linux:   ~/.config/moonshine-stt/
//!
//! Data dir (models):
//!   Windows: %LOCALAPPDATA%\moonshine-stt\
//!   macOS:   ~/Library/Application Support/moonshine-stt/
//!   Linux:   ~/.local/share/moonshine-stt/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Default directory for the four graph files and `tokenizer.json`.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "moonshine-stt";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let models_dir = data_dir.join("models");

        Self {
            config_dir,
            settings_file,
            models_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
