//! # Configuration Module
//!
//! Tunables for the analysis pipeline. Everything has a default matching the
//! behaviour of a browser analyser node at its stock settings, so most callers
//! just use `TunerConfig::default()`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Default transform size in samples.
pub const DEFAULT_FFT_SIZE: usize = 16384;

/// Lower edge of the decibel range mapped onto byte magnitudes.
pub const DEFAULT_MIN_DECIBELS: f32 = -100.0;

/// Upper edge of the decibel range mapped onto byte magnitudes.
pub const DEFAULT_MAX_DECIBELS: f32 = -30.0;

/// Sample rate requested from the input device when it offers a choice.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Roughly one display refresh at 60 Hz.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Spacing between "tuned" points on the dial, in Hz.
pub const DEFAULT_TUNED_SPACING_HZ: u32 = 30;

/// Integer-Hz window searched on either side of the rounded peak.
pub const DEFAULT_TUNED_WINDOW_HZ: u32 = 4;

/// Tolerance used to decide whether a reading is near a tuned point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TolerancePolicy {
    /// A reading is near-tuned when a multiple of this value is in reach.
    pub spacing_hz: u32,
    /// How far (in whole Hz) either side of the rounded peak to look.
    pub window_hz: u32,
}

impl Default for TolerancePolicy {
    fn default() -> Self {
        Self {
            spacing_hz: DEFAULT_TUNED_SPACING_HZ,
            window_hz: DEFAULT_TUNED_WINDOW_HZ,
        }
    }
}

/// Audio capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Number of samples kept for each analysis window.
    pub window_size: usize,
    /// Preferred device sample rate in Hz.
    pub preferred_sample_rate: u32,
    /// Capacity of the channel between the audio callback and the frame loop, in chunks.
    pub channel_capacity: usize,
}

/// Spectral analysis settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Transform size (power of two).
    pub fft_size: usize,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

/// Complete configuration for a tuning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunerConfig {
    pub fft_size: usize,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub preferred_sample_rate: u32,
    /// Delay between analysis ticks.
    pub frame_interval: Duration,
    pub channel_capacity: usize,
    pub tolerance: TolerancePolicy,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
            preferred_sample_rate: DEFAULT_SAMPLE_RATE,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            channel_capacity: 64,
            tolerance: TolerancePolicy::default(),
        }
    }
}

impl TunerConfig {
    /// Checks the settings that the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analyzer().validate()?;
        if self.tolerance.spacing_hz == 0 {
            return Err(ConfigError::ZeroSpacing);
        }
        if self.frame_interval.is_zero() {
            return Err(ConfigError::ZeroFrameInterval);
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }
        Ok(())
    }

    pub fn analyzer(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            fft_size: self.fft_size,
            min_decibels: self.min_decibels,
            max_decibels: self.max_decibels,
        }
    }

    pub fn capture(&self) -> CaptureConfig {
        CaptureConfig {
            window_size: self.fft_size,
            preferred_sample_rate: self.preferred_sample_rate,
            channel_capacity: self.channel_capacity,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        TunerConfig::default().analyzer()
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            return Err(ConfigError::FftSize(self.fft_size));
        }
        if !(self.min_decibels < self.max_decibels) {
            return Err(ConfigError::DecibelRange {
                min: self.min_decibels,
                max: self.max_decibels,
            });
        }
        Ok(())
    }
}
