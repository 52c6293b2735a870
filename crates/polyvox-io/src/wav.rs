//! WAV output for offline renders.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavWriter};

use crate::{Error, Result};

/// WAV file metadata, read without loading sample data.
#[derive(Debug, Clone, PartialEq)]
pub struct WavInfo {
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Whether samples are IEEE floats.
    pub is_float: bool,
    /// Sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
}

/// Write interleaved stereo samples as a 32-bit float WAV file.
///
/// `interleaved` is `[L0, R0, L1, R1, ...]` and must have even length.
pub fn write_wav_stereo<P: AsRef<Path>>(
    path: P,
    interleaved: &[f32],
    sample_rate: u32,
) -> Result<()> {
    if interleaved.len() % 2 != 0 {
        return Err(Error::OddSampleCount(interleaved.len()));
    }

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let path = path.as_ref();
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in interleaved {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    tracing::debug!(
        path = %path.display(),
        frames = interleaved.len() / 2,
        sample_rate,
        "wav written"
    );
    Ok(())
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.len()) / u64::from(spec.channels.max(1));

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        is_float: spec.sample_format == SampleFormat::Float,
        num_frames,
        duration_secs: num_frames as f64 / f64::from(spec.sample_rate),
    })
}

/// Read every sample of a WAV file, interleaved, as f32 in `[-1, 1]`.
///
/// Integer files are scaled by their bit depth.
pub fn read_wav_interleaved<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavInfo)> {
    let path = path.as_ref();
    let info = read_wav_info(path)?;
    let mut reader = WavReader::open(path)?;

    let samples = if info.is_float {
        reader.samples::<f32>().collect::<std::result::Result<Vec<_>, _>>()?
    } else {
        let scale = (1i64 << (info.bits_per_sample.saturating_sub(1))) as f32;
        reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / scale))
            .collect::<std::result::Result<Vec<_>, _>>()?
    };
    Ok((samples, info))
}
