//! Conversion domain types.
//!
//! * [`ConversionRequest`]: one immutable per-file request.
//! * [`ConversionParams`]: voice/model/format shared by a batch.
//! * [`ConversionResult`]: per-file outcome handed to the UI.
//! * [`OutputFormat`] / [`WavBitDepth`]: remote format identifiers.
//! * [`SttsModel`]: the two remote speech-to-speech models.

pub mod format;
pub mod request;

pub use format::{FormatError, FormatFamily, OutputFormat, WavBitDepth, KNOWN_OUTPUT_FORMATS};
pub use request::{
    is_supported_input, output_path_for, ConversionParams, ConversionRequest, ConversionResult,
    SttsModel, UsageInfo, SUPPORTED_INPUT_EXTENSIONS,
};
