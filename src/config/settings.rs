//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::conversion::{SttsModel, WavBitDepth};

/// Environment variable consulted when no API key is stored in the config.
pub const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

/// Connection settings for the ElevenLabs REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the API, without the `/v1` suffix.
    pub base_url: String,
    /// API key.  `None` means "read [`API_KEY_ENV`] at connect time".
    pub api_key: Option<String>,
    /// Per-request transport timeout in seconds.  Conversions of long files
    /// can take minutes.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".into(),
            api_key: None,
            timeout_secs: 300,
        }
    }
}

impl ApiConfig {
    /// The key to authenticate with: the stored key when non-blank,
    /// otherwise the [`API_KEY_ENV`] environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| {
                std::env::var(API_KEY_ENV)
                    .ok()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
            })
    }
}

// ---------------------------------------------------------------------------
// VoiceSliders
// ---------------------------------------------------------------------------

/// Tuning values remembered per voice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSliders {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub speaker_boost: bool,
}

impl Default for VoiceSliders {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            speaker_boost: true,
        }
    }
}

// ---------------------------------------------------------------------------
// ConversionConfig
// ---------------------------------------------------------------------------

/// Last-used conversion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Voice selected in the previous session.
    pub voice_id: Option<String>,
    /// Speech-to-speech model.
    pub model: SttsModel,
    /// Remote output format identifier, e.g. `"mp3_44100_128"`.
    pub output_format: String,
    /// Bit depth WAV output is rewritten to.
    pub wav_bit_depth: WavBitDepth,
    /// Ask the service to strip background noise from the source.
    pub remove_background_noise: bool,
    /// Directory converted files are written to.  Relative paths resolve
    /// against the working directory.
    pub output_dir: PathBuf,
    /// Slider values keyed by voice id.
    pub voice_settings: BTreeMap<String, VoiceSliders>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            voice_id: None,
            model: SttsModel::default(),
            output_format: "mp3_44100_128".into(),
            wav_bit_depth: WavBitDepth::default(),
            remove_background_noise: false,
            output_dir: PathBuf::from("output"),
            voice_settings: BTreeMap::new(),
        }
    }
}

impl ConversionConfig {
    /// Slider values stored for `voice_id`, or the defaults.
    pub fn sliders_for(&self, voice_id: &str) -> VoiceSliders {
        self.voice_settings
            .get(voice_id)
            .copied()
            .unwrap_or_default()
    }

    /// Remember `sliders` for `voice_id`.
    pub fn remember_sliders(&mut self, voice_id: &str, sliders: VoiceSliders) {
        self.voice_settings.insert(voice_id.to_string(), sliders);
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Initial inner window size in logical pixels.
    pub window_size: (f32, f32),
    /// Connect automatically on launch when an API key is available.
    pub auto_connect: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_size: (900.0, 640.0),
            auto_connect: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use batch_voice_converter::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote API settings.
    pub api: ApiConfig,
    /// Last-used conversion parameters.
    pub conversion: ConversionConfig,
    /// Window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = AppPaths::under(dir.path()).settings_file;

        let saved = AppConfig::default();
        saved.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(saved.api.base_url, loaded.api.base_url);
        assert_eq!(saved.api.api_key, loaded.api.api_key);
        assert_eq!(saved.api.timeout_secs, loaded.api.timeout_secs);
        assert_eq!(saved.conversion.model, loaded.conversion.model);
        assert_eq!(
            saved.conversion.output_format,
            loaded.conversion.output_format
        );
        assert_eq!(
            saved.conversion.wav_bit_depth,
            loaded.conversion.wav_bit_depth
        );
        assert_eq!(saved.conversion.output_dir, loaded.conversion.output_dir);
        assert_eq!(saved.ui.window_size, loaded.ui.window_size);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");

        assert_eq!(config.conversion.output_format, "mp3_44100_128");
        assert!(config.conversion.voice_id.is_none());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.api.base_url, "https://api.elevenlabs.io");
        assert!(cfg.api.api_key.is_none());
        assert_eq!(cfg.conversion.model, SttsModel::Multilingual);
        assert_eq!(cfg.conversion.wav_bit_depth, WavBitDepth::Sixteen);
        assert_eq!(cfg.conversion.output_dir, PathBuf::from("output"));
        assert!(!cfg.conversion.remove_background_noise);
        assert!(cfg.ui.auto_connect);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.api.api_key = Some("xi-test".into());
        cfg.conversion.voice_id = Some("21m00Tcm4TlvDq8ikWAM".into());
        cfg.conversion.model = SttsModel::English;
        cfg.conversion.output_format = "pcm_32000".into();
        cfg.conversion.wav_bit_depth = WavBitDepth::TwentyFour;
        cfg.conversion.remember_sliders(
            "21m00Tcm4TlvDq8ikWAM",
            VoiceSliders {
                stability: 0.2,
                similarity_boost: 0.9,
                style: 0.4,
                speaker_boost: false,
            },
        );

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.api.api_key.as_deref(), Some("xi-test"));
        assert_eq!(
            loaded.conversion.voice_id.as_deref(),
            Some("21m00Tcm4TlvDq8ikWAM")
        );
        assert_eq!(loaded.conversion.model, SttsModel::English);
        assert_eq!(loaded.conversion.output_format, "pcm_32000");
        assert_eq!(loaded.conversion.wav_bit_depth, WavBitDepth::TwentyFour);

        let sliders = loaded.conversion.sliders_for("21m00Tcm4TlvDq8ikWAM");
        assert!(!sliders.speaker_boost);
        assert!((sliders.style - 0.4).abs() < f32::EPSILON);
    }

    /// Older files missing whole sections still load.
    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[conversion]\noutput_format = \"flac_24\"\n").unwrap();

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.conversion.output_format, "flac_24");
        assert_eq!(cfg.api.timeout_secs, ApiConfig::default().timeout_secs);
    }

    #[test]
    fn sliders_for_unknown_voice_are_default() {
        let cfg = ConversionConfig::default();
        assert_eq!(cfg.sliders_for("nope"), VoiceSliders::default());
    }

    #[test]
    fn stored_key_wins_over_environment() {
        let api = ApiConfig {
            api_key: Some("  stored  ".into()),
            ..ApiConfig::default()
        };
        assert_eq!(api.resolved_api_key().as_deref(), Some("stored"));
    }
}
