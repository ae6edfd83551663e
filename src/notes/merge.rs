// Segment merging
// One greedy forward pass absorbing short and pitch-similar neighbors

use crate::contour::nan_median;
use crate::notes::types::{Segment, SegmenterConfig};

/// Merge adjacent segments in a single left-to-right greedy pass
///
/// Each incoming segment is compared against the currently accumulated
/// previous segment, never against earlier output:
/// - an accumulated segment still shorter than the minimum note duration
///   absorbs the next segment unconditionally (too short to be a plausible
///   note, so treated as noise whatever its pitch);
/// - otherwise the two median pitches are compared and the next segment is
///   absorbed when they differ by less than the merge tolerance;
/// - otherwise the accumulator is committed and restarted.
///
/// This is deliberately not iterated to a fixed point: downstream behavior
/// depends on the exact single-pass result, so re-running the pass on its
/// own output is not equivalent and must not be done.
pub fn merge_segments(
    segments: &[Segment],
    pitch: &[f64],
    time_step: f64,
    config: &SegmenterConfig,
) -> Vec<Segment> {
    let mut iter = segments.iter();
    let mut acc = match iter.next() {
        Some(first) => *first,
        None => return Vec::new(),
    };

    let mut merged = Vec::new();
    for &seg in iter {
        if acc.duration(time_step) < config.min_note_duration {
            acc = Segment::new(acc.start, seg.end);
            continue;
        }

        let acc_pitch = nan_median(&pitch[acc.start..acc.end]);
        let seg_pitch = nan_median(&pitch[seg.start..seg.end]);
        if (acc_pitch - seg_pitch).abs() < config.merge_tolerance {
            acc = Segment::new(acc.start, seg.end);
        } else {
            merged.push(acc);
            acc = seg;
        }
    }
    merged.push(acc);
    merged
}
