//! Post-processing for converted audio.
//!
//! The remote service returns encoded bytes that are written to disk as-is.
//! Only WAV output needs local work: its sample width is rewritten to the
//! user's chosen bit depth.
//!
//! ```text
//! pcm_* / wav_* bytes → output file → correct_bit_depth → 16/24/32-bit WAV
//! ```

pub mod wav;

pub use wav::{correct_bit_depth, AudioError};
