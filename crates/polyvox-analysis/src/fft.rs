//! Recursive radix-2 Cooley-Tukey FFT.
//!
//! Decimation in time over index ranges: a call transforms the samples
//! `input[offset], input[offset + stride], ...` into a contiguous output slice,
//! recursing on the even and odd subsequences (same offset / offset + stride,
//! doubled stride) and combining them with the butterfly
//!
//! ```text
//! X[k]         = E[k] + W_N^k * O[k]
//! X[k + N / 2] = E[k] - W_N^k * O[k]
//! ```
//!
//! The twiddle table `W_N^k = exp(-2πi k / N)` is computed once per size; a
//! sub-transform of length `N / 2^d` reads every `2^d`-th entry. Nothing is
//! allocated per call, which makes the transform usable from the audio thread.

use crate::{Complex, Error, Result};

/// Forward FFT of a fixed power-of-two size.
#[derive(Debug, Clone)]
pub struct Radix2Fft {
    size: usize,
    twiddles: Vec<Complex<f32>>,
}

impl Radix2Fft {
    /// Create a transform for `size` points.
    ///
    /// Returns [`Error::NotPowerOfTwo`] unless `size` is a nonzero power of two.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 || !size.is_power_of_two() {
            return Err(Error::NotPowerOfTwo(size));
        }

        // f64 for the table keeps large sizes accurate to f32 precision.
        let twiddles = (0..size / 2)
            .map(|k| {
                let angle = -std::f64::consts::TAU * k as f64 / size as f64;
                Complex::new(angle.cos() as f32, angle.sin() as f32)
            })
            .collect();

        Ok(Self { size, twiddles })
    }

    /// Transform size in points.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Transform a real-valued block into `output`.
    ///
    /// Both slices must be exactly [`size`](Self::size) long; the full complex
    /// spectrum (including the mirrored negative frequencies) is written.
    pub fn process_real(&self, input: &[f32], output: &mut [Complex<f32>]) -> Result<()> {
        self.check_len(input.len())?;
        self.check_len(output.len())?;
        transform(input, 0, 1, output, &self.twiddles, 1);
        Ok(())
    }

    fn check_len(&self, actual: usize) -> Result<()> {
        if actual == self.size {
            Ok(())
        } else {
            Err(Error::LengthMismatch {
                expected: self.size,
                actual,
            })
        }
    }
}

fn transform(
    input: &[f32],
    offset: usize,
    stride: usize,
    out: &mut [Complex<f32>],
    twiddles: &[Complex<f32>],
    twiddle_stride: usize,
) {
    let len = out.len();
    if len == 1 {
        out[0] = Complex::new(input[offset], 0.0);
        return;
    }

    let half = len / 2;
    let (even, odd) = out.split_at_mut(half);
    transform(input, offset, stride * 2, even, twiddles, twiddle_stride * 2);
    transform(
        input,
        offset + stride,
        stride * 2,
        odd,
        twiddles,
        twiddle_stride * 2,
    );

    for k in 0..half {
        let t = twiddles[k * twiddle_stride] * odd[k];
        let e = even[k];
        even[k] = e + t;
        odd[k] = e - t;
    }
}
