use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const SETTINGS_STORE_PATH: &str = "settings_store.json";

/// Bounds of the user-facing interval selector.
pub const MIN_RESPONSE_INTERVAL_SECS: u64 = 1;
pub const MAX_RESPONSE_INTERVAL_SECS: u64 = 10;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// Minimum spacing between suggestion fetches, in whole seconds.
    #[serde(default = "default_response_interval_secs")]
    pub response_interval_secs: u64,
    /// Directory archived conversations are written to.
    #[serde(default = "default_save_dir")]
    pub save_dir: String,
    /// Suggestion API endpoint receiving the transcript.
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
    /// Static API credential; the KIBITZ_API_KEY environment variable wins.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_local_speaker_label")]
    pub local_speaker_label: String,
    #[serde(default = "default_remote_speaker_label")]
    pub remote_speaker_label: String,
    /// Run the (out-of-scope) transcription pipeline with a local model.
    #[serde(default)]
    pub use_local_model: bool,
}

impl AppSettings {
    pub fn clamped_interval_secs(&self) -> u64 {
        self.response_interval_secs
            .clamp(MIN_RESPONSE_INTERVAL_SECS, MAX_RESPONSE_INTERVAL_SECS)
    }
}

fn default_response_interval_secs() -> u64 {
    2
}

fn default_save_dir() -> String {
    "conversations".to_string()
}

fn default_api_endpoint() -> String {
    "http://localhost:8080/api/chat".to_string()
}

fn default_local_speaker_label() -> String {
    "You".to_string()
}

fn default_remote_speaker_label() -> String {
    "Them".to_string()
}

pub fn get_default_settings() -> AppSettings {
    AppSettings {
        response_interval_secs: default_response_interval_secs(),
        save_dir: default_save_dir(),
        api_endpoint: default_api_endpoint(),
        api_key: String::new(),
        local_speaker_label: default_local_speaker_label(),
        remote_speaker_label: default_remote_speaker_label(),
        use_local_model: false,
    }
}

/// Load settings from the store file, creating it with defaults when absent.
/// An unreadable or unparseable store falls back to defaults, which are
/// written back so the next run starts clean.
pub fn load_or_create_app_settings(path: &Path) -> AppSettings {
    if path.exists() {
        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<AppSettings>(&raw) {
                Ok(settings) => {
                    info!("Found existing settings: {:?}", path);
                    return settings;
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}. Falling back to defaults", e);
                }
            },
            Err(e) => {
                warn!("Failed to read settings file {:?}: {}", path, e);
            }
        }
    }

    let default_settings = get_default_settings();
    if let Err(e) = write_settings(path, &default_settings) {
        warn!("Failed to store default settings: {}", e);
    }
    default_settings
}

pub fn write_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    let raw =
        serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
    fs::write(path, raw).with_context(|| format!("Failed to write settings file {:?}", path))
}
