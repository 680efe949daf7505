// tone-core/src/lib.rs

//! The core logic for the tone dial.
//! This crate is responsible for audio capture, spectral analysis, peak
//! extraction and mapping the peak onto the dial. It is completely headless
//! and contains no rendering code; a [`DisplayAdapter`] receives each reading.

pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod frame_loop;
pub mod pitch;
pub mod reference;
pub mod session;
pub mod tuning;

use serde::{Deserialize, Serialize};

pub use config::{TolerancePolicy, TunerConfig};
pub use error::{AnalysisError, CaptureError, ConfigError, PitchError, SessionError};
pub use frame_loop::{FrameLoop, LoopState, SessionEnd};
pub use reference::{ReferenceHandle, ReferencePitch};
pub use session::TunerSession;

/// Represents the result of a single audio analysis frame.
///
/// Each reading fully replaces the previous one; nothing is accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneReading {
    /// Frequency of the strongest spectrum bin in Hz.
    pub peak_frequency_hz: f32,
    /// Dial rotation, one full turn per octave away from the reference.
    pub rotation_degrees: f32,
    /// Whether the peak is within the tolerance window of a tuned point.
    pub is_near_tuned: bool,
}

impl ToneReading {
    /// The peak rounded to whole Hz, as shown next to the dial.
    pub fn display_frequency(&self) -> i64 {
        self.peak_frequency_hz.round() as i64
    }

    pub fn tint(&self) -> DialTint {
        if self.is_near_tuned {
            DialTint::Tuned
        } else {
            DialTint::Untuned
        }
    }
}

/// Colour cue for the dial background.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialTint {
    Tuned,
    #[default]
    Untuned,
}

impl DialTint {
    pub fn hex(self) -> &'static str {
        match self {
            DialTint::Tuned => "#B592A0",
            DialTint::Untuned => "#AAFAC8",
        }
    }
}

/// Receives the latest reading once per frame.
pub trait DisplayAdapter {
    fn publish(&mut self, reading: &ToneReading);
}

/// Forwards readings to another thread. A disconnected receiver is ignored.
impl DisplayAdapter for crossbeam_channel::Sender<ToneReading> {
    fn publish(&mut self, reading: &ToneReading) {
        let _ = self.send(*reading);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_frequency_rounds() {
        let reading = ToneReading {
            peak_frequency_hz: 439.6,
            rotation_degrees: 0.0,
            is_near_tuned: false,
        };
        assert_eq!(reading.display_frequency(), 440);
    }

    #[test]
    fn test_tint_follows_near_tuned() {
        let mut reading = ToneReading {
            peak_frequency_hz: 300.0,
            rotation_degrees: 0.0,
            is_near_tuned: true,
        };
        assert_eq!(reading.tint(), DialTint::Tuned);
        assert_eq!(reading.tint().hex(), "#B592A0");
        reading.is_near_tuned = false;
        assert_eq!(reading.tint().hex(), "#AAFAC8");
        assert_eq!(DialTint::default(), DialTint::Untuned);
    }

    #[test]
    fn test_sender_is_display() {
        let (mut tx, rx) = crossbeam_channel::unbounded();
        let reading = ToneReading {
            peak_frequency_hz: 1.0,
            rotation_degrees: 2.0,
            is_near_tuned: false,
        };
        tx.publish(&reading);
        assert_eq!(rx.try_recv().unwrap(), reading);
        drop(rx);
        tx.publish(&reading);
    }

    #[test]
    fn test_reading_json_round_trip() {
        let reading = ToneReading {
            peak_frequency_hz: 436.5,
            rotation_degrees: 4.25,
            is_near_tuned: false,
        };
        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"rotation_degrees\":4.25"));
        let back: ToneReading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reading);
    }
}
