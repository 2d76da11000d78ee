//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across
//! threads.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Settings for model resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory holding the four graph files and `tokenizer.json`.
    /// `None` means [`AppPaths::models_dir`]; a CLI argument overrides both.
    pub dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Settings for live microphone capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Length of each transcription window in seconds.
    pub window_secs: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { window_secs: 1.0 }
    }
}

// ---------------------------------------------------------------------------
// DecodeConfig
// ---------------------------------------------------------------------------

/// Settings for the decode loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Explicit token budget per utterance; `0` derives the budget from the
    /// audio duration.
    pub max_tokens: usize,
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Top-level application configuration, persisted as TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
}

impl AppConfig {
    /// Load configuration from the platform settings file, or return
    /// defaults when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load configuration from an explicit path (useful in tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&data)?)
    }

    /// Persist configuration to the platform settings file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Persist configuration to an explicit path (useful in tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Model directory after applying the override chain:
    /// CLI argument → settings file → platform default.
    pub fn models_dir(&self, cli_override: Option<&std::path::Path>) -> PathBuf {
        if let Some(dir) = cli_override {
            return dir.to_path_buf();
        }
        self.model
            .dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().models_dir)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert!(config.model.dir.is_none());
        assert!((config.capture.window_secs - 1.0).abs() < 1e-6);
        assert_eq!(config.decode.max_tokens, 0);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let config = AppConfig::load_from(std::path::Path::new("/nonexistent/settings.toml"))
            .unwrap();
        assert_eq!(config.decode.max_tokens, 0);
    }

    #[test]
    fn save_and_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let config = AppConfig {
            model: ModelConfig {
                dir: Some(PathBuf::from("/opt/models")),
            },
            capture: CaptureConfig { window_secs: 2.5 },
            decode: DecodeConfig { max_tokens: 128 },
        };
        config.save_to(&path).unwrap();

        let reloaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.model.dir, Some(PathBuf::from("/opt/models")));
        assert!((reloaded.capture.window_secs - 2.5).abs() < 1e-6);
        assert_eq!(reloaded.decode.max_tokens, 128);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[decode]\nmax_tokens = 42\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.decode.max_tokens, 42);
        assert!((config.capture.window_secs - 1.0).abs() < 1e-6);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "not valid toml [[[").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn models_dir_override_chain() {
        let config = AppConfig {
            model: ModelConfig {
                dir: Some(PathBuf::from("/from/settings")),
            },
            ..AppConfig::default()
        };

        let cli = std::path::Path::new("/from/cli");
        assert_eq!(config.models_dir(Some(cli)), PathBuf::from("/from/cli"));
        assert_eq!(config.models_dir(None), PathBuf::from("/from/settings"));

        let bare = AppConfig::default();
        // Platform default ends with the models directory name.
        assert!(bare.models_dir(None).ends_with("models"));
    }
}
