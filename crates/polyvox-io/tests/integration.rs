//! Integration tests for polyvox-io WAV output.

use polyvox_io::{Error, read_wav_info, read_wav_interleaved, write_wav_stereo};
use tempfile::TempDir;

/// Interleaved stereo sine, left at `left_hz`, right at `right_hz`.
fn stereo_sine(sample_rate: u32, left_hz: f32, right_hz: f32, frames: usize) -> Vec<f32> {
    let sr = sample_rate as f32;
    (0..frames)
        .flat_map(|i| {
            let t = i as f32 / sr;
            [
                (std::f32::consts::TAU * left_hz * t).sin() * 0.5,
                (std::f32::consts::TAU * right_hz * t).sin() * 0.5,
            ]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// WAV output
// ---------------------------------------------------------------------------

#[test]
fn one_second_render_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("render.wav");
    let samples = stereo_sine(48000, 440.0, 660.0, 48000);

    write_wav_stereo(&path, &samples, 48000).unwrap();

    let info = read_wav_info(&path).unwrap();
    assert_eq!(info.channels, 2);
    assert_eq!(info.num_frames, 48000);
    assert!((info.duration_secs - 1.0).abs() < 1e-9);

    let (loaded, _) = read_wav_interleaved(&path).unwrap();
    assert_eq!(loaded.len(), samples.len());
    for (a, b) in samples.iter().zip(&loaded) {
        assert!((a - b).abs() < 1e-7);
    }
}

#[test]
fn empty_render_writes_valid_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.wav");
    write_wav_stereo(&path, &[], 22050).unwrap();

    let info = read_wav_info(&path).unwrap();
    assert_eq!(info.num_frames, 0);
    assert_eq!(info.sample_rate, 22050);
}

#[test]
fn unwritable_path_reports_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing-dir").join("out.wav");
    let err = write_wav_stereo(&path, &[0.0, 0.0], 48000).unwrap_err();
    assert!(matches!(err, Error::Wav(_) | Error::Io(_)));
}
