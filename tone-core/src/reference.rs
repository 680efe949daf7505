//! # Reference Pitch Module
//!
//! The reference pitch is the user-chosen anchor (Hz) that the dial rotation is
//! measured against. It lives in the conventional concert-pitch band of
//! 415 to 466 Hz and can be changed at any time from outside the audio thread.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

use crate::error::PitchError;

/// Lowest selectable reference in Hz.
pub const MIN_REFERENCE_HZ: u32 = 415;
/// Highest selectable reference in Hz.
pub const MAX_REFERENCE_HZ: u32 = 466;
/// Reference used until the user picks another one.
pub const DEFAULT_REFERENCE_HZ: u32 = 440;

/// Every selectable reference, ascending.
static REFERENCE_OPTIONS: Lazy<Vec<ReferencePitch>> = Lazy::new(|| {
    (MIN_REFERENCE_HZ..=MAX_REFERENCE_HZ)
        .map(ReferencePitch)
        .collect()
});

/// A reference frequency that is known to be within the selectable band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ReferencePitch(u32);

impl ReferencePitch {
    /// Validates a reference frequency.
    ///
    /// # Returns
    /// * `Ok(pitch)` - `hz` is within 415..=466
    /// * `Err(PitchError::OutOfRange)` - Otherwise
    pub fn new(hz: u32) -> Result<Self, PitchError> {
        if (MIN_REFERENCE_HZ..=MAX_REFERENCE_HZ).contains(&hz) {
            Ok(Self(hz))
        } else {
            Err(PitchError::OutOfRange(hz))
        }
    }

    /// The reference in whole Hz.
    pub fn hz(self) -> u32 {
        self.0
    }

    /// The selectable references, 415 through 466 Hz.
    pub fn options() -> &'static [ReferencePitch] {
        &REFERENCE_OPTIONS
    }
}

impl Default for ReferencePitch {
    fn default() -> Self {
        Self(DEFAULT_REFERENCE_HZ)
    }
}

impl TryFrom<u32> for ReferencePitch {
    type Error = PitchError;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        Self::new(hz)
    }
}

impl From<ReferencePitch> for u32 {
    fn from(pitch: ReferencePitch) -> Self {
        pitch.0
    }
}

impl std::fmt::Display for ReferencePitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

/// Shared, lock-free cell holding the current reference pitch.
///
/// Clones share the same value. The whole value is stored and loaded in a
/// single atomic operation, so readers never observe a partial write.
#[derive(Debug, Clone)]
pub struct ReferenceHandle {
    hz: Arc<AtomicU32>,
}

impl ReferenceHandle {
    pub fn new(initial: ReferencePitch) -> Self {
        Self {
            hz: Arc::new(AtomicU32::new(initial.hz())),
        }
    }

    /// Returns the reference currently in effect.
    pub fn current(&self) -> ReferencePitch {
        // Only validated values are ever stored.
        ReferencePitch(self.hz.load(Ordering::Acquire))
    }

    /// Applies a selection event.
    ///
    /// Returns `true` if the value was accepted. Out-of-range selections are
    /// ignored and the previous reference stays in effect.
    pub fn select(&self, hz: u32) -> bool {
        match ReferencePitch::new(hz) {
            Ok(pitch) => {
                self.set(pitch);
                true
            }
            Err(e) => {
                debug!("Ignoring reference selection: {}", e);
                false
            }
        }
    }

    /// Stores an already validated reference.
    pub fn set(&self, pitch: ReferencePitch) {
        let previous = self.hz.swap(pitch.hz(), Ordering::AcqRel);
        if previous != pitch.hz() {
            debug!("Reference pitch changed: {} Hz -> {} Hz", previous, pitch.hz());
        }
    }
}

impl Default for ReferenceHandle {
    fn default() -> Self {
        Self::new(ReferencePitch::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_440() {
        assert_eq!(ReferenceHandle::default().current().hz(), 440);
    }

    #[test]
    fn test_band_edges_accepted() {
        assert!(ReferencePitch::new(415).is_ok());
        assert!(ReferencePitch::new(466).is_ok());
    }

    #[test]
    fn test_out_of_range_selection_keeps_previous() {
        let handle = ReferenceHandle::default();
        assert!(handle.select(432));
        assert!(!handle.select(414));
        assert_eq!(handle.current().hz(), 432);
        assert!(!handle.select(467));
        assert_eq!(handle.current().hz(), 432);
        assert!(!handle.select(0));
        assert_eq!(handle.current().hz(), 432);
    }

    #[test]
    fn test_clones_share_value() {
        let handle = ReferenceHandle::default();
        let writer = handle.clone();
        let writer_thread = std::thread::spawn(move || writer.select(442));
        assert!(writer_thread.join().unwrap());
        assert_eq!(handle.current().hz(), 442);
    }

    #[test]
    fn test_options_cover_band() {
        let options = ReferencePitch::options();
        assert_eq!(options.len(), 52);
        assert_eq!(options.first().map(|p| p.hz()), Some(415));
        assert_eq!(options.last().map(|p| p.hz()), Some(466));
        assert!(options.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_error_message_names_value() {
        let err = ReferencePitch::new(500).unwrap_err();
        assert_eq!(err, PitchError::OutOfRange(500));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_deserialize_enforces_band() {
        assert!(serde_json::from_str::<ReferencePitch>("414").is_err());
        assert!(serde_json::from_str::<ReferencePitch>("467").is_err());
        let pitch: ReferencePitch = serde_json::from_str("415").unwrap();
        assert_eq!(pitch.hz(), 415);
        assert_eq!(serde_json::to_string(&pitch).unwrap(), "415");
    }
}
