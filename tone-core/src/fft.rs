//! # Fast Fourier Transform (FFT) Module
//!
//! Turns a window of time-domain samples into an 8-bit magnitude spectrum, the
//! same shape of data a real-time analyser node hands out: Blackman window,
//! forward FFT, magnitudes in decibels, then mapped onto 0..=255 between a
//! configurable floor and ceiling.
//!
//! ## Saturation
//! A loud tone pushes the bins of the window's main lobe (the tone's bin and
//! its neighbours) past the ceiling, so several bins read 255. Peak extraction
//! takes the lowest of equal maxima, which then reports the bin just below the
//! tone. Lowering the input level or raising `max_decibels` avoids this.

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;
use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::error::{AnalysisError, ConfigError};

/// A magnitude spectrum with one byte per frequency bin.
///
/// Bin `i` is centred on `i * bin_width` Hz, so frequencies increase strictly
/// with the index.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    magnitudes: Vec<u8>,
    bin_width: f32,
}

impl Spectrum {
    /// Builds a spectrum from raw byte magnitudes and the bin width in Hz.
    ///
    /// # Arguments
    /// * `magnitudes` - One byte per bin, lowest frequency first
    /// * `bin_width` - Width of one bin in Hz, must be positive
    pub fn new(magnitudes: Vec<u8>, bin_width: f32) -> Self {
        debug_assert!(bin_width > 0.0);
        Self {
            magnitudes,
            bin_width,
        }
    }

    /// Width of one bin: `sample_rate / window_size`.
    pub fn bin_width(&self) -> f32 {
        self.bin_width
    }

    /// Centre frequency of `bin` in Hz.
    pub fn frequency_at(&self, bin: usize) -> f32 {
        bin as f32 * self.bin_width
    }

    /// Byte magnitudes, lowest frequency first.
    pub fn magnitudes(&self) -> &[u8] {
        &self.magnitudes
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// `(frequency_hz, magnitude)` pairs in ascending frequency order.
    pub fn bins(&self) -> impl Iterator<Item = (f32, u8)> + '_ {
        self.magnitudes
            .iter()
            .enumerate()
            .map(|(i, &m)| (self.frequency_at(i), m))
    }
}

/// Applies a Blackman window to the input buffer to reduce spectral leakage.
fn blackman_window(n: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    let n_f = n as f32;
    (0..n)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / n_f;
            A0 - A1 * x.cos() + A2 * (2.0 * x).cos()
        })
        .collect()
}

/// Maps a linear magnitude onto a byte between the decibel floor and ceiling.
///
/// Zero magnitude is minus infinity decibels and lands on 0.
fn quantize(magnitude: f32, min_decibels: f32, max_decibels: f32) -> u8 {
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 / (max_decibels - min_decibels) * (db - min_decibels);
    // NaN collapses to 0 through max().
    scaled.max(0.0).min(255.0).floor() as u8
}

/// Reusable spectral analyzer for one transform size and sample rate.
///
/// The FFT is planned once; the window coefficients and work buffers are
/// allocated once and reused for every call to [`SpectralAnalyzer::analyze`].
pub struct SpectralAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    config: AnalyzerConfig,
    sample_rate: u32,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for SpectralAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralAnalyzer")
            .field("config", &self.config)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

impl SpectralAnalyzer {
    /// Plans the FFT and precomputes the window for one transform size.
    ///
    /// # Arguments
    /// * `config` - Transform size and decibel range
    /// * `sample_rate` - Sample rate of the incoming windows in Hz
    ///
    /// # Returns
    /// * `Ok(analyzer)` - Ready to analyze windows of `config.fft_size` samples
    /// * `Err(e)` - Size is not a power of two of at least 2, or the decibel range is empty
    pub fn new(config: AnalyzerConfig, sample_rate: u32) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        debug!(
            "Planned {}-point FFT at {} Hz ({:.3} Hz per bin)",
            config.fft_size,
            sample_rate,
            sample_rate as f32 / config.fft_size as f32
        );

        Ok(Self {
            fft,
            config,
            sample_rate,
            window: blackman_window(config.fft_size),
            buffer: vec![Complex::new(0.0, 0.0); config.fft_size],
            scratch,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Computes the byte spectrum of one window.
    ///
    /// This function:
    /// 1. Applies the Blackman window
    /// 2. Runs the forward FFT
    /// 3. Converts the first half of the bins to decibels and quantizes them
    ///
    /// # Arguments
    /// * `samples` - Time-domain samples, exactly `fft_size` long
    ///
    /// # Returns
    /// * `Ok(spectrum)` - `fft_size / 2` bins; all zero for silence
    /// * `Err(AnalysisError::MalformedWindow)` - Wrong window length
    pub fn analyze(&mut self, samples: &[f32]) -> Result<Spectrum, AnalysisError> {
        let n = self.config.fft_size;
        if samples.len() != n {
            return Err(AnalysisError::MalformedWindow {
                expected: n,
                actual: samples.len(),
            });
        }

        for ((slot, &sample), &w) in self.buffer.iter_mut().zip(samples).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = 1.0 / n as f32;
        let magnitudes = self
            .buffer
            .iter()
            .take(n / 2)
            .map(|c| {
                quantize(
                    c.norm() * scale,
                    self.config.min_decibels,
                    self.config.max_decibels,
                )
            })
            .collect();

        Ok(Spectrum::new(
            magnitudes,
            self.sample_rate as f32 / n as f32,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn analyzer(fft_size: usize, sample_rate: u32) -> SpectralAnalyzer {
        let config = AnalyzerConfig {
            fft_size,
            ..Default::default()
        };
        SpectralAnalyzer::new(config, sample_rate).unwrap()
    }

    fn sine(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * amplitude
            })
            .collect()
    }

    #[test]
    fn test_silence_is_all_zero() {
        let mut analyzer = analyzer(1024, 8192);
        let spectrum = analyzer.analyze(&vec![0.0; 1024]).unwrap();
        assert_eq!(spectrum.len(), 512);
        assert!(spectrum.magnitudes().iter().all(|&m| m == 0));
    }

    #[test]
    fn test_rejects_wrong_window_length() {
        let mut analyzer = analyzer(1024, 8192);
        let err = analyzer.analyze(&vec![0.0; 1000]).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MalformedWindow {
                expected: 1024,
                actual: 1000
            }
        );
    }

    #[test]
    fn test_bin_centred_tone_peaks_on_its_bin() {
        // 8 Hz bins; 440 Hz sits exactly on bin 55.
        let mut analyzer = analyzer(1024, 8192);
        let spectrum = analyzer.analyze(&sine(440.0, 0.01, 8192, 1024)).unwrap();
        let mags = spectrum.magnitudes();
        assert!(mags[55] > mags[54], "{} vs {}", mags[55], mags[54]);
        assert!(mags[55] > mags[56], "{} vs {}", mags[55], mags[56]);
        assert!(mags[55] < 255);
        assert_eq!(spectrum.frequency_at(55), 440.0);
    }

    #[test]
    fn test_loud_tone_saturates_main_lobe() {
        let mut analyzer = analyzer(1024, 8192);
        let spectrum = analyzer.analyze(&sine(440.0, 0.5, 8192, 1024)).unwrap();
        let mags = spectrum.magnitudes();
        assert_eq!(&mags[54..=56], &[255, 255, 255]);
        assert!(mags[53] < 255);
        assert!(mags[57] < 255);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let mut analyzer = analyzer(2048, 44100);
        let input = sine(1000.0, 0.2, 44100, 2048);
        let first = analyzer.analyze(&input).unwrap();
        let second = analyzer.analyze(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_quantize_range() {
        assert_eq!(quantize(0.0, -100.0, -30.0), 0);
        assert_eq!(quantize(1.0, -100.0, -30.0), 255);
        // -65 dB is halfway.
        let mid = 10f32.powf(-65.0 / 20.0);
        assert_eq!(quantize(mid, -100.0, -30.0), 127);
        assert_eq!(quantize(f32::NAN, -100.0, -30.0), 0);
    }

    #[test]
    fn test_blackman_window_shape() {
        let window = blackman_window(8);
        assert!(window[0].abs() < 1e-6);
        assert!((window[4] - 1.0).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_half_as_many_bins_strictly_increasing(
            exp in 1u32..12,
            sample_rate in prop::sample::select(vec![8000u32, 22050, 44100, 48000]),
            seed in any::<u32>(),
        ) {
            let n = 1usize << exp;
            let mut analyzer = analyzer(n, sample_rate);
            let samples: Vec<f32> = (0..n)
                .map(|i| ((i as u32).wrapping_mul(seed | 1) % 2000) as f32 / 1000.0 - 1.0)
                .collect();
            let spectrum = analyzer.analyze(&samples).unwrap();
            prop_assert_eq!(spectrum.len(), n / 2);
            let freqs: Vec<f32> = spectrum.bins().map(|(f, _)| f).collect();
            prop_assert!(freqs.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(freqs[0], 0.0);
        }
    }
}
