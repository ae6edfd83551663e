// Pitch contour representation
// Holds per-frame estimator output and maps frequencies onto the MIDI scale

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a contour fails validation
#[derive(Debug, Error)]
pub enum ContourError {
    #[error("Contour array length mismatch: time={time}, f0={f0}, confidence={confidence}")]
    LengthMismatch {
        time: usize,
        f0: usize,
        confidence: usize,
    },

    #[error("Contour time step must be positive, got {0}")]
    InvalidTimeStep(f64),
}

/// Per-frame pitch estimator output for one audio source
///
/// Produced once per transcription request by an external estimator and
/// consumed read-only by the segmentation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitchContour {
    /// Frame timestamps in seconds, strictly increasing
    pub time: Vec<f64>,

    /// Fundamental frequency per frame in Hz; 0.0 means unvoiced
    pub f0: Vec<f64>,

    /// Estimator confidence per frame [0.0, 1.0]
    pub confidence: Vec<f64>,

    /// Inter-frame spacing in seconds reported by the estimator
    /// Carried explicitly so estimators with different frame rates work unchanged
    pub time_step: f64,
}

impl PitchContour {
    /// Number of frames in the contour
    pub fn len(&self) -> usize {
        self.f0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.f0.is_empty()
    }

    /// Check that all three arrays share a length and the time step is usable
    pub fn validate(&self) -> Result<(), ContourError> {
        if self.time.len() != self.f0.len() || self.f0.len() != self.confidence.len() {
            return Err(ContourError::LengthMismatch {
                time: self.time.len(),
                f0: self.f0.len(),
                confidence: self.confidence.len(),
            });
        }
        if !(self.time_step > 0.0) {
            return Err(ContourError::InvalidTimeStep(self.time_step));
        }
        Ok(())
    }

    /// Map the frequency contour onto the fractional MIDI scale
    ///
    /// Frames below 1 Hz are unvoiced and map to NaN, which guards the
    /// logarithm and keeps them out of downstream reductions.
    pub fn midi_pitch(&self) -> Vec<f64> {
        self.f0.iter().map(|&hz| hz_to_midi(hz)).collect()
    }
}

/// Convert a frequency in Hz to a fractional MIDI pitch
/// Returns NaN for frequencies below 1 Hz (unvoiced frames)
pub fn hz_to_midi(hz: f64) -> f64 {
    if hz < 1.0 {
        f64::NAN
    } else {
        69.0 + 12.0 * (hz / 440.0).log2()
    }
}

/// Median of the non-NaN values in a slice
/// Returns NaN when every value is NaN (or the slice is empty)
pub fn nan_median(values: &[f64]) -> f64 {
    let mut defined: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if defined.is_empty() {
        return f64::NAN;
    }
    defined.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = defined.len() / 2;
    if defined.len() % 2 == 1 {
        defined[mid]
    } else {
        (defined[mid - 1] + defined[mid]) / 2.0
    }
}

/// Mean of the non-NaN values in a slice
/// Returns NaN when every value is NaN (or the slice is empty)
pub fn nan_mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}
