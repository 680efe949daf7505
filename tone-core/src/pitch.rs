//! # Peak Extraction Module
//!
//! Picks the dominant tone of a frame: the bin with the largest magnitude.
//! There is no interpolation between bins, so the estimate is quantized to the
//! spectrum's bin width.

use crate::fft::Spectrum;

/// The strongest bin of a spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub bin: usize,
    pub frequency: f32,
    pub magnitude: u8,
}

/// Finds the bin with the maximum magnitude.
///
/// When several bins share the maximum the lowest-frequency one wins. An
/// all-zero spectrum therefore yields bin 0 (0 Hz), which is a valid, if
/// degenerate, reading.
///
/// # Arguments
/// * `spectrum` - Byte magnitude spectrum of one frame
///
/// # Returns
/// * `Some(peak)` - Bin index, centre frequency and magnitude of the maximum
/// * `None` - The spectrum has no bins
pub fn find_peak(spectrum: &Spectrum) -> Option<Peak> {
    let mut best: Option<(usize, u8)> = None;
    for (bin, &magnitude) in spectrum.magnitudes().iter().enumerate() {
        // Strictly greater keeps the first of equal maxima.
        if best.is_none_or(|(_, m)| magnitude > m) {
            best = Some((bin, magnitude));
        }
    }
    best.map(|(bin, magnitude)| Peak {
        bin,
        frequency: spectrum.frequency_at(bin),
        magnitude,
    })
}

/// Frequency in Hz of the strongest bin, 0.0 for an empty spectrum.
pub fn peak_frequency(spectrum: &Spectrum) -> f32 {
    find_peak(spectrum).map_or(0.0, |peak| peak.frequency)
}
