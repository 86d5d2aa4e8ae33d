//! Output format identifiers and WAV bit depths.
//!
//! The remote service names formats as `<codec>_<sample rate>[_<bitrate>]`
//! (`mp3_44100_128`, `pcm_32000`, …).  [`OutputFormat`] keeps that
//! identifier verbatim for the request and derives the file family from its
//! prefix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifiers offered in the format picker.
pub const KNOWN_OUTPUT_FORMATS: &[&str] = &[
    "mp3_44100_128",
    "mp3_44100_192",
    "mp3_22050_32",
    "flac_24",
    "flac_44100",
    "pcm_16000",
    "pcm_22050",
    "pcm_24000",
    "pcm_32000",
    "pcm_44100",
    "ulaw_8000",
];

/// Errors raised while parsing an output format identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("unknown output format: {0:?}")]
    Unknown(String),

    /// PCM/WAV identifiers must carry their sample rate (`pcm_32000`).
    #[error("output format {0:?} has no valid sample rate")]
    InvalidSampleRate(String),

    #[error("unsupported WAV bit depth: {0}")]
    UnsupportedBitDepth(u16),
}

// ---------------------------------------------------------------------------
// FormatFamily
// ---------------------------------------------------------------------------

/// Container/codec family of an output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatFamily {
    Mp3,
    Flac,
    /// Headerless PCM from the service, stored as `.wav`.
    Pcm,
    Wav,
    Ulaw,
    Opus,
}

impl FormatFamily {
    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            FormatFamily::Mp3 => "mp3",
            FormatFamily::Flac => "flac",
            FormatFamily::Pcm | FormatFamily::Wav => "wav",
            FormatFamily::Ulaw => "ulaw",
            FormatFamily::Opus => "opus",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "mp3" => Some(FormatFamily::Mp3),
            "flac" => Some(FormatFamily::Flac),
            "pcm" => Some(FormatFamily::Pcm),
            "wav" => Some(FormatFamily::Wav),
            "ulaw" => Some(FormatFamily::Ulaw),
            "opus" => Some(FormatFamily::Opus),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// OutputFormat
// ---------------------------------------------------------------------------

/// A validated remote output format.
///
/// ```
/// use batch_voice_converter::conversion::OutputFormat;
///
/// let fmt: OutputFormat = "pcm_32000".parse().unwrap();
/// assert_eq!(fmt.extension(), "wav");
/// assert_eq!(fmt.sample_rate(), Some(32_000));
/// assert_eq!(fmt.as_str(), "pcm_32000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormat {
    id: String,
    family: FormatFamily,
    sample_rate: Option<u32>,
}

impl OutputFormat {
    /// The identifier exactly as the remote service expects it.
    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn family(&self) -> FormatFamily {
        self.family
    }

    pub fn extension(&self) -> &'static str {
        self.family.extension()
    }

    /// Sample rate in Hz; only known for PCM/WAV formats.
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    /// `true` when the output is written as a `.wav` file and needs the
    /// bit-depth correction pass.
    pub fn is_wav(&self) -> bool {
        matches!(self.family, FormatFamily::Pcm | FormatFamily::Wav)
    }
}

impl FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim();
        let (prefix, rest) = id
            .split_once('_')
            .ok_or_else(|| FormatError::Unknown(id.to_string()))?;

        let family =
            FormatFamily::from_prefix(prefix).ok_or_else(|| FormatError::Unknown(id.to_string()))?;

        let sample_rate = match family {
            FormatFamily::Pcm | FormatFamily::Wav => {
                let rate = rest
                    .split('_')
                    .next()
                    .and_then(|r| r.parse::<u32>().ok())
                    .filter(|r| *r > 0)
                    .ok_or_else(|| FormatError::InvalidSampleRate(id.to_string()))?;
                Some(rate)
            }
            _ => None,
        };

        Ok(Self {
            id: id.to_string(),
            family,
            sample_rate,
        })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

// ---------------------------------------------------------------------------
// WavBitDepth
// ---------------------------------------------------------------------------

/// Integer sample width WAV output is rewritten to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum WavBitDepth {
    #[default]
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl WavBitDepth {
    pub const ALL: [WavBitDepth; 3] = [
        WavBitDepth::Sixteen,
        WavBitDepth::TwentyFour,
        WavBitDepth::ThirtyTwo,
    ];

    pub fn bits(self) -> u16 {
        match self {
            WavBitDepth::Sixteen => 16,
            WavBitDepth::TwentyFour => 24,
            WavBitDepth::ThirtyTwo => 32,
        }
    }
}

impl TryFrom<u16> for WavBitDepth {
    type Error = FormatError;

    fn try_from(bits: u16) -> Result<Self, Self::Error> {
        match bits {
            16 => Ok(WavBitDepth::Sixteen),
            24 => Ok(WavBitDepth::TwentyFour),
            32 => Ok(WavBitDepth::ThirtyTwo),
            other => Err(FormatError::UnsupportedBitDepth(other)),
        }
    }
}

impl From<WavBitDepth> for u16 {
    fn from(depth: WavBitDepth) -> Self {
        depth.bits()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
