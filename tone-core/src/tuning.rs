//! # Tone Mapping Module
//!
//! Maps a peak frequency onto the dial. One octave is one full turn: a tone an
//! octave above the reference sits at -360 degrees, an octave below at +360.
//! Independently of the rotation, a reading is flagged as near-tuned when a
//! multiple of the tuned spacing lies within a few whole Hz of the peak.

use crate::config::TolerancePolicy;
use crate::reference::ReferencePitch;

/// Degrees of dial rotation per octave.
pub const DEGREES_PER_OCTAVE: f32 = 360.0;

/// Octave-relative dial rotation for `freq` against `reference`.
///
/// Higher tones rotate negatively. Returns `None` when the frequency is zero,
/// negative or not finite, because the logarithm has no value there.
pub fn rotation_degrees(freq: f32, reference: ReferencePitch) -> Option<f32> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }
    let rotation = -(freq / reference.hz() as f32).log2() * DEGREES_PER_OCTAVE;
    rotation.is_finite().then_some(rotation)
}

/// Whether `freq` rounds to within `policy.window_hz` of a multiple of
/// `policy.spacing_hz`.
///
/// The peak is rounded to the nearest whole Hz first, then every integer in
/// `rounded - window ..= rounded + window` is checked. Silence rounds to 0, which
/// is a multiple of everything, so it reads as near-tuned.
pub fn is_near_tuned(freq: f32, policy: &TolerancePolicy) -> bool {
    if !freq.is_finite() || policy.spacing_hz == 0 {
        return false;
    }
    let rounded = freq.round() as i64;
    let window = policy.window_hz as i64;
    let spacing = policy.spacing_hz as i64;
    (rounded.saturating_sub(window)..=rounded.saturating_add(window))
        .any(|candidate| candidate.rem_euclid(spacing) == 0)
}

/// Result of mapping one peak frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneMapping {
    /// `None` when the peak has no defined rotation (see [`rotation_degrees`]).
    pub rotation_degrees: Option<f32>,
    pub is_near_tuned: bool,
}

/// Pure mapping from a peak frequency and reference to dial values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ToneMapper {
    policy: TolerancePolicy,
}

impl ToneMapper {
    /// Creates a mapper using `policy` for the near-tuned check.
    pub fn new(policy: TolerancePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TolerancePolicy {
        &self.policy
    }

    /// Maps one peak frequency onto the dial.
    ///
    /// # Arguments
    /// * `freq` - Peak frequency in Hz; zero is allowed
    /// * `reference` - Reference pitch for the rotation
    ///
    /// # Returns
    /// * `ToneMapping` - Rotation (`None` for a zero or invalid peak) and the
    ///   near-tuned flag
    pub fn map(&self, freq: f32, reference: ReferencePitch) -> ToneMapping {
        ToneMapping {
            rotation_degrees: rotation_degrees(freq, reference),
            is_near_tuned: is_near_tuned(freq, &self.policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a440() -> ReferencePitch {
        ReferencePitch::new(440).unwrap()
    }

    fn near(freq: f32) -> bool {
        is_near_tuned(freq, &TolerancePolicy::default())
    }

    #[test]
    fn test_unison_has_no_rotation() {
        assert_eq!(rotation_degrees(440.0, a440()), Some(0.0));
    }

    #[test]
    fn test_octave_is_full_turn() {
        let up = rotation_degrees(880.0, a440()).unwrap();
        let down = rotation_degrees(220.0, a440()).unwrap();
        assert!((up + 360.0).abs() < 1e-3, "got {}", up);
        assert!((down - 360.0).abs() < 1e-3, "got {}", down);
    }

    #[test]
    fn test_semitone_is_thirty_degrees() {
        let semitone_up = 440.0 * 2f32.powf(1.0 / 12.0);
        let rotation = rotation_degrees(semitone_up, a440()).unwrap();
        assert!((rotation + 30.0).abs() < 1e-2, "got {}", rotation);
    }

    #[test]
    fn test_rotation_follows_reference() {
        let reference = ReferencePitch::new(415).unwrap();
        assert_eq!(rotation_degrees(415.0, reference), Some(0.0));
        assert!(rotation_degrees(440.0, reference).unwrap() < 0.0);
    }

    #[test]
    fn test_zero_and_invalid_have_no_rotation() {
        assert_eq!(rotation_degrees(0.0, a440()), None);
        assert_eq!(rotation_degrees(-5.0, a440()), None);
        assert_eq!(rotation_degrees(f32::NAN, a440()), None);
        assert_eq!(rotation_degrees(f32::INFINITY, a440()), None);
    }

    #[test]
    fn test_tiny_frequency_is_finite() {
        let rotation = rotation_degrees(f32::MIN_POSITIVE, a440()).unwrap();
        assert!(rotation.is_finite() && rotation > 0.0);
    }

    #[test]
    fn test_near_tuned_window() {
        assert!(near(300.0));
        assert!(near(301.0));
        assert!(near(304.0));
        assert!(near(296.0));
        assert!(near(326.0));
        // 312..=320 holds no multiple of 30.
        assert!(!near(316.0));
        assert!(!near(305.0));
        assert!(!near(295.0));
    }

    #[test]
    fn test_near_tuned_rounds_first() {
        assert!(near(304.4));
        assert!(!near(304.6));
        assert!(near(295.5));
        assert!(!near(295.4));
    }

    #[test]
    fn test_silence_reads_near_tuned() {
        assert!(near(0.0));
    }

    #[test]
    fn test_extreme_values_do_not_overflow() {
        assert!(!near(f32::NAN));
        near(f32::MAX);
        near(-f32::MAX);
    }

    #[test]
    fn test_custom_policy() {
        let policy = TolerancePolicy {
            spacing_hz: 100,
            window_hz: 0,
        };
        assert!(is_near_tuned(400.0, &policy));
        assert!(!is_near_tuned(401.0, &policy));
    }

    #[test]
    fn test_mapper_combines_both() {
        let mapper = ToneMapper::default();
        let mapping = mapper.map(880.0, a440());
        assert!(!mapping.is_near_tuned);
        assert!(mapping.rotation_degrees.is_some());

        let silent = mapper.map(0.0, a440());
        assert_eq!(silent.rotation_degrees, None);
        assert!(silent.is_near_tuned);
    }
}
