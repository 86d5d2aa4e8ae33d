//! Per-file conversion requests and results.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::format::{OutputFormat, WavBitDepth};
use crate::config::VoiceSliders;

/// Extra information the service reports about a conversion
/// (e.g. `character-cost`).
pub type UsageInfo = BTreeMap<String, String>;

/// Extensions accepted when adding source files.
pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a"];

/// `true` when `path` has one of [`SUPPORTED_INPUT_EXTENSIONS`]
/// (case-insensitive).
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| SUPPORTED_INPUT_EXTENSIONS.contains(&e.as_str()))
}

/// Output location for `source`: `output_dir/converted_<stem>.<ext>`.
///
/// Two sources with the same stem map to the same path; the later
/// conversion overwrites the earlier one.
pub fn output_path_for(source: &Path, output_dir: &Path, format: &OutputFormat) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "audio".to_string());
    output_dir.join(format!("converted_{stem}.{}", format.extension()))
}

// ---------------------------------------------------------------------------
// SttsModel
// ---------------------------------------------------------------------------

/// Remote speech-to-speech model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SttsModel {
    #[default]
    Multilingual,
    English,
}

impl SttsModel {
    pub const ALL: [SttsModel; 2] = [SttsModel::Multilingual, SttsModel::English];

    /// Identifier sent as `model_id`.
    pub fn id(self) -> &'static str {
        match self {
            SttsModel::Multilingual => "eleven_multilingual_sts_v2",
            SttsModel::English => "eleven_english_sts_v2",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SttsModel::Multilingual => "Multilingual v2",
            SttsModel::English => "English v2",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SttsModel::Multilingual => "Speech-to-speech for 29 languages",
            SttsModel::English => "Speech-to-speech tuned for English only",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }
}

impl fmt::Display for SttsModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// ConversionParams
// ---------------------------------------------------------------------------

/// Parameters shared by every file of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionParams {
    pub voice_id: String,
    pub model: SttsModel,
    pub output_format: OutputFormat,
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
    pub style: Option<f32>,
    pub speaker_boost: bool,
    pub remove_background_noise: bool,
    pub wav_bit_depth: WavBitDepth,
}

impl ConversionParams {
    /// Parameters with every slider unset and the flags off.
    pub fn new(voice_id: impl Into<String>, model: SttsModel, output_format: OutputFormat) -> Self {
        Self {
            voice_id: voice_id.into(),
            model,
            output_format,
            stability: None,
            similarity_boost: None,
            style: None,
            speaker_boost: false,
            remove_background_noise: false,
            wav_bit_depth: WavBitDepth::default(),
        }
    }

    /// Copy slider values in from a stored [`VoiceSliders`].
    pub fn with_sliders(mut self, sliders: VoiceSliders) -> Self {
        self.stability = Some(sliders.stability);
        self.similarity_boost = Some(sliders.similarity_boost);
        self.style = Some(sliders.style);
        self.speaker_boost = sliders.speaker_boost;
        self
    }
}

// ---------------------------------------------------------------------------
// ConversionRequest
// ---------------------------------------------------------------------------

/// One file to convert.  Built once per file when a batch starts and never
/// modified afterwards: fields are only readable through accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    source_file_path: PathBuf,
    voice_id: String,
    model: SttsModel,
    output_format: OutputFormat,
    stability: Option<f32>,
    similarity_boost: Option<f32>,
    style: Option<f32>,
    speaker_boost: bool,
    remove_background_noise: bool,
    wav_bit_depth: WavBitDepth,
}

impl ConversionRequest {
    /// Build a request for `source`, clamping slider values into `[0, 1]`.
    pub fn new(source: impl Into<PathBuf>, params: &ConversionParams) -> Self {
        Self {
            source_file_path: source.into(),
            voice_id: params.voice_id.clone(),
            model: params.model,
            output_format: params.output_format.clone(),
            stability: params.stability.map(unit_clamp),
            similarity_boost: params.similarity_boost.map(unit_clamp),
            style: params.style.map(unit_clamp),
            speaker_boost: params.speaker_boost,
            remove_background_noise: params.remove_background_noise,
            wav_bit_depth: params.wav_bit_depth,
        }
    }

    pub fn source_file_path(&self) -> &Path {
        &self.source_file_path
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    pub fn model(&self) -> SttsModel {
        self.model
    }

    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format
    }

    /// In `[0, 1]`; `None` leaves the voice's own setting in place.
    pub fn stability(&self) -> Option<f32> {
        self.stability
    }

    pub fn similarity_boost(&self) -> Option<f32> {
        self.similarity_boost
    }

    pub fn style(&self) -> Option<f32> {
        self.style
    }

    pub fn speaker_boost(&self) -> bool {
        self.speaker_boost
    }

    pub fn remove_background_noise(&self) -> bool {
        self.remove_background_noise
    }

    /// Only used when the output format is WAV.
    pub fn wav_bit_depth(&self) -> WavBitDepth {
        self.wav_bit_depth
    }
}

fn unit_clamp(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// ConversionResult
// ---------------------------------------------------------------------------

/// Outcome of one [`ConversionRequest`].
///
/// Only [`ConversionResult::succeeded`] attaches an output path, so a
/// failed result can never point at a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    source_file_path: PathBuf,
    output_file_path: Option<PathBuf>,
    success: bool,
    usage_info: UsageInfo,
    error: Option<String>,
}

impl ConversionResult {
    pub fn succeeded(source: impl Into<PathBuf>, output: impl Into<PathBuf>, usage: UsageInfo) -> Self {
        Self {
            source_file_path: source.into(),
            output_file_path: Some(output.into()),
            success: true,
            usage_info: usage,
            error: None,
        }
    }

    pub fn failed(source: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            source_file_path: source.into(),
            output_file_path: None,
            success: false,
            usage_info: UsageInfo::new(),
            error: Some(reason.into()),
        }
    }

    pub fn source_file_path(&self) -> &Path {
        &self.source_file_path
    }

    pub fn output_file_path(&self) -> Option<&Path> {
        self.output_file_path.as_deref()
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn usage_info(&self) -> &UsageInfo {
        &self.usage_info
    }

    /// Short reason for a failure.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
