//! WAV bit-depth correction.
//!
//! The service does not guarantee the sample width of PCM output: `pcm_*`
//! formats arrive as headerless little-endian 16-bit mono samples, and
//! RIFF output may use a different width than the one the user picked.
//! [`correct_bit_depth`] rewrites a written `.wav` file so its header and
//! samples match the requested [`WavBitDepth`].
//!
//! | Input | Handling |
//! |-------|----------|
//! | `RIFF…` file | decoded with `hound`, channels and rate kept |
//! | anything else | raw `i16` LE mono at the format's sample rate |
//!
//! # Example
//!
//! ```rust,no_run
//! use batch_voice_converter::audio::correct_bit_depth;
//! use batch_voice_converter::conversion::WavBitDepth;
//!
//! correct_bit_depth("output/converted_take.wav", 32_000, WavBitDepth::TwentyFour).unwrap();
//! ```

use std::io::Cursor;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use thiserror::Error;

use crate::conversion::WavBitDepth;

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Reason a WAV file could not be corrected.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid WAV data: {0}")]
    Wav(#[from] hound::Error),

    /// The file holds no samples.
    #[error("audio file contains no samples")]
    Empty,
}

// ---------------------------------------------------------------------------
// Decoded audio
// ---------------------------------------------------------------------------

/// Interleaved samples scaled to the full `i32` range.
struct Decoded {
    channels: u16,
    sample_rate: u32,
    /// Width and format of the source, used to skip no-op rewrites.
    source_bits: u16,
    source_format: SampleFormat,
    /// Headerless input: always rewritten.
    needs_header: bool,
    samples: Vec<i32>,
}

fn decode_riff(data: &[u8]) -> Result<Decoded, AudioError> {
    let mut reader = WavReader::new(Cursor::new(data))?;
    let spec = reader.spec();

    let samples: Vec<i32> = match spec.sample_format {
        SampleFormat::Int => {
            let shift = 32 - u32::from(spec.bits_per_sample.min(32));
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v.wrapping_shl(shift)))
                .collect::<Result<_, _>>()?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (f64::from(v.clamp(-1.0, 1.0)) * f64::from(i32::MAX)) as i32))
            .collect::<Result<_, _>>()?,
    };

    Ok(Decoded {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        source_bits: spec.bits_per_sample,
        source_format: spec.sample_format,
        needs_header: false,
        samples,
    })
}

fn decode_raw_pcm16(data: &[u8], sample_rate: u32) -> Decoded {
    if data.len() % 2 != 0 {
        log::warn!(
            "Raw PCM has an odd length ({} bytes), dropping the trailing byte",
            data.len()
        );
    }
    let samples = data
        .chunks_exact(2)
        .map(|b| i32::from(i16::from_le_bytes([b[0], b[1]])) << 16)
        .collect();

    Decoded {
        channels: 1,
        sample_rate,
        source_bits: 16,
        source_format: SampleFormat::Int,
        needs_header: true,
        samples,
    }
}

// ---------------------------------------------------------------------------
// correct_bit_depth
// ---------------------------------------------------------------------------

/// Rewrite the WAV (or raw PCM) file at `path` with `depth`-bit integer
/// samples.
///
/// `sample_rate` is only used for headerless input.  The file is replaced
/// through a sibling temporary file, so a failure leaves the original
/// bytes in place.  A RIFF file already at the requested width is left
/// untouched.
pub fn correct_bit_depth(
    path: impl AsRef<Path>,
    sample_rate: u32,
    depth: WavBitDepth,
) -> Result<(), AudioError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;

    let decoded = if data.starts_with(b"RIFF") {
        decode_riff(&data)?
    } else {
        decode_raw_pcm16(&data, sample_rate)
    };

    if decoded.samples.is_empty() {
        return Err(AudioError::Empty);
    }

    if !decoded.needs_header
        && decoded.source_format == SampleFormat::Int
        && decoded.source_bits == depth.bits()
    {
        log::debug!(
            "{} already {}-bit, leaving as is",
            path.display(),
            depth.bits()
        );
        return Ok(());
    }

    let spec = WavSpec {
        channels: decoded.channels,
        sample_rate: decoded.sample_rate,
        bits_per_sample: depth.bits(),
        sample_format: SampleFormat::Int,
    };

    let tmp = temp_path(path);
    if let Err(e) = write_samples(&tmp, spec, &decoded.samples) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path)?;

    log::debug!(
        "Rewrote {} as {}-bit ({} Hz, {} ch)",
        path.display(),
        depth.bits(),
        decoded.sample_rate,
        decoded.channels
    );
    Ok(())
}

fn write_samples(path: &Path, spec: WavSpec, samples: &[i32]) -> Result<(), AudioError> {
    let shift = 32 - u32::from(spec.bits_per_sample);
    let mut writer = WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample(s >> shift)?;
    }
    writer.finalize()?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn raw_pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn write_wav16(path: &Path, samples: &[i16], channels: u16) {
        let spec = WavSpec {
            channels,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut w = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            w.write_sample(s).unwrap();
        }
        w.finalize().unwrap();
    }

    fn read_back(path: &Path) -> (WavSpec, Vec<i32>) {
        let mut r = WavReader::open(path).unwrap();
        let spec = r.spec();
        let samples = r.samples::<i32>().map(Result::unwrap).collect();
        (spec, samples)
    }

    #[test]
    fn raw_pcm_gets_header_at_requested_depth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        std::fs::write(&path, raw_pcm(&[0, 1, -1, i16::MAX, i16::MIN])).unwrap();

        correct_bit_depth(&path, 32_000, WavBitDepth::TwentyFour).unwrap();

        let (spec, samples) = read_back(&path);
        assert_eq!(spec.bits_per_sample, 24);
        assert_eq!(spec.sample_rate, 32_000);
        assert_eq!(spec.channels, 1);
        assert_eq!(
            samples,
            vec![0, 256, -256, i32::from(i16::MAX) << 8, i32::from(i16::MIN) << 8]
        );
    }

    #[test]
    fn raw_pcm_at_sixteen_bits_gets_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        std::fs::write(&path, raw_pcm(&[5, -5])).unwrap();

        correct_bit_depth(&path, 16_000, WavBitDepth::Sixteen).unwrap();

        let (spec, samples) = read_back(&path);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(samples, vec![5, -5]);
    }

    #[test]
    fn odd_trailing_byte_of_raw_pcm_is_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("odd.wav");
        let mut data = raw_pcm(&[7, -7]);
        data.push(0x42);
        std::fs::write(&path, data).unwrap();

        correct_bit_depth(&path, 16_000, WavBitDepth::Sixteen).unwrap();

        let (spec, samples) = read_back(&path);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(samples, vec![7, -7]);
    }

    #[test]
    fn riff_input_is_widened_and_keeps_channels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav16(&path, &[100, -100, 200, -200], 2);

        correct_bit_depth(&path, 16_000, WavBitDepth::ThirtyTwo).unwrap();

        let (spec, samples) = read_back(&path);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(samples, vec![100 << 16, -100 << 16, 200 << 16, -200 << 16]);
    }

    #[test]
    fn matching_depth_is_left_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("same.wav");
        write_wav16(&path, &[1, 2, 3], 1);
        let before = std::fs::read(&path).unwrap();

        correct_bit_depth(&path, 16_000, WavBitDepth::Sixteen).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn empty_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        std::fs::write(&path, b"").unwrap();

        assert!(matches!(
            correct_bit_depth(&path, 16_000, WavBitDepth::Sixteen),
            Err(AudioError::Empty)
        ));
    }

    #[test]
    fn corrupt_riff_keeps_original_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        std::fs::write(&path, b"RIFF\x00\x00garbage").unwrap();

        assert!(matches!(
            correct_bit_depth(&path, 16_000, WavBitDepth::TwentyFour),
            Err(AudioError::Wav(_))
        ));
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF\x00\x00garbage");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            correct_bit_depth("/no/such/file.wav", 16_000, WavBitDepth::Sixteen),
            Err(AudioError::Io(_))
        ));
    }
}
