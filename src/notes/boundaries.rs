// Note boundary detection
// Hypothesizes boundaries where pitch is unstable and the estimator is unsure

use crate::contour::PitchContour;
use crate::notes::types::{Segment, SegmenterConfig};

/// Detect note boundary candidates and partition the contour into segments
///
/// The boundary-candidate signal is `(1 - confidence) * |pitch gradient|`,
/// normalized to [0, 1]. Neither axis alone is evidence of a new note:
/// a confident vibrato wobble and an uncertain steady tone both score low.
/// Voicing transitions (voiced to unvoiced or back) are always boundaries,
/// since the gradient is undefined across them and a silent gap must not be
/// bridged into a neighboring note. Zero retained peaks is valid and yields
/// a single whole-contour segment.
pub fn detect_segments(contour: &PitchContour, config: &SegmenterConfig) -> Vec<Segment> {
    let n = contour.len();
    if n == 0 {
        return Vec::new();
    }

    let pitch = contour.midi_pitch();
    let grad = normalized_gradient(&pitch);

    let combined: Vec<f64> = grad
        .iter()
        .zip(contour.confidence.iter())
        .map(|(&g, &c)| (1.0 - c) * g)
        .collect();

    let peaks = find_peaks(&combined, config.boundary_height);
    let mut boundaries: Vec<usize> = peaks
        .into_iter()
        .filter(|&i| contour.confidence[i] > config.peak_confidence)
        .collect();

    // The confidence cutoff does not apply to voicing transitions: silence
    // is a boundary no matter how sure the estimator claims to be.
    for i in 1..n {
        if pitch[i].is_nan() != pitch[i - 1].is_nan() {
            boundaries.push(i);
        }
    }
    boundaries.sort_unstable();
    boundaries.dedup();

    segments_from_boundaries(&boundaries, n)
}

/// Absolute discrete gradient of the pitch contour, normalized to [0, 1]
///
/// Central differences in the interior, one-sided at the two edges.
/// Undefined (NaN) results become 0. A constant contour normalizes to
/// all zeros: the maximum is treated as 1 when the raw maximum is 0.
fn normalized_gradient(pitch: &[f64]) -> Vec<f64> {
    let n = pitch.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let mut grad = Vec::with_capacity(n);
    for i in 0..n {
        let raw = if i == 0 {
            pitch[1] - pitch[0]
        } else if i == n - 1 {
            pitch[n - 1] - pitch[n - 2]
        } else {
            (pitch[i + 1] - pitch[i - 1]) / 2.0
        };
        let abs = raw.abs();
        grad.push(if abs.is_nan() { 0.0 } else { abs });
    }

    let max = grad.iter().copied().fold(0.0f64, f64::max);
    let scale = if max > 0.0 { max } else { 1.0 };
    for g in &mut grad {
        *g /= scale;
    }
    grad
}

/// Indices of local maxima at or above a minimum height
///
/// A peak is a sample (or flat plateau) strictly higher than the samples on
/// either side; a plateau reports its middle index. Edges never qualify.
fn find_peaks(signal: &[f64], min_height: f64) -> Vec<usize> {
    let mut peaks = Vec::new();
    let n = signal.len();
    if n < 3 {
        return peaks;
    }

    let mut i = 1;
    while i < n - 1 {
        if signal[i] > signal[i - 1] {
            // Walk across any plateau of equal values
            let mut ahead = i + 1;
            while ahead < n - 1 && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                let mid = (i + ahead - 1) / 2;
                if signal[mid] >= min_height {
                    peaks.push(mid);
                }
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Build the segment partition of [0, n) from sorted boundary indices
/// Each boundary closes the current segment and opens the next
fn segments_from_boundaries(boundaries: &[usize], n: usize) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 0;
    for &boundary in boundaries {
        segments.push(Segment::new(start, boundary));
        start = boundary;
    }
    segments.push(Segment::new(start, n));
    segments
}
