//! Error types for capture, analysis, configuration and reference selection.

use cpal::{
    BuildStreamError, DeviceNameError, PlayStreamError, SupportedStreamConfigsError,
};

/// The microphone could not be opened. The session never starts.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("No input device available")]
    NoDevice,
    #[error("No suitable f32 input format found")]
    NoSupportedConfig,
    #[error("Could not read device name: {0}")]
    DeviceName(#[from] DeviceNameError),
    #[error("Could not query input configs: {0}")]
    Configs(#[from] SupportedStreamConfigsError),
    #[error("Could not build input stream: {0}")]
    Stream(#[from] BuildStreamError),
    #[error("Could not start input stream: {0}")]
    Play(#[from] PlayStreamError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// The window handed to the analyzer does not match the transform size.
    #[error("Sample window has {actual} samples, expected {expected}")]
    MalformedWindow { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("FFT size must be a power of two and at least 2, got {0}")]
    FftSize(usize),
    #[error("Decibel range is empty: min {min} dB, max {max} dB")]
    DecibelRange { min: f32, max: f32 },
    #[error("Tuned spacing must be non-zero")]
    ZeroSpacing,
    #[error("Frame interval must be non-zero")]
    ZeroFrameInterval,
    #[error("Channel capacity must be non-zero")]
    ZeroChannelCapacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PitchError {
    #[error("Reference pitch {0} Hz is outside 415..=466 Hz")]
    OutOfRange(u32),
}

/// Why a capture session could not run.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Frame loop has already run")]
    AlreadyRunning,
}
