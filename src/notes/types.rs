// Segmentation value types
// Segments partition the contour frame range; note events are the final output

use serde::{Deserialize, Serialize};

/// A half-open frame-index range [start, end) into a pitch contour
///
/// At every pipeline stage the segment list forms a strictly increasing,
/// non-overlapping, contiguous partition of [0, N). Filtering removes
/// segments but never alters the survivors' ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn new(start: usize, end: usize) -> Self {
        Segment { start, end }
    }

    /// Frame count covered by this segment
    pub fn frames(&self) -> usize {
        self.end - self.start
    }

    /// Duration in seconds for a given inter-frame spacing
    pub fn duration(&self, time_step: f64) -> f64 {
        self.frames() as f64 * time_step
    }
}

/// A single transcribed note
///
/// Immutable once created by the segment filter; consumed by the track encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Onset time in seconds from the start of the audio
    pub onset: f64,

    /// Offset time in seconds; always greater than the onset
    pub offset: f64,

    /// Rounded integer MIDI pitch
    pub pitch: u8,

    /// Velocity after the global remap, bounded to the configured range
    pub velocity: f64,
}

impl NoteEvent {
    pub fn duration(&self) -> f64 {
        self.offset - self.onset
    }
}

/// Thresholds steering boundary detection, merging, and filtering
///
/// All pipeline variants are expressed through this one structure rather
/// than forked algorithm copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Minimum height of a boundary-candidate peak in the combined signal
    pub boundary_height: f64,

    /// Minimum estimator confidence at a frame for it to count as a boundary
    pub peak_confidence: f64,

    /// Segments shorter than this (seconds) are absorbed while merging and
    /// dropped while filtering
    pub min_note_duration: f64,

    /// Adjacent segments whose median pitches differ by less than this many
    /// semitones are merged
    pub merge_tolerance: f64,

    /// Minimum median confidence for a segment to survive filtering
    pub min_confidence: f64,

    /// Target mean of the velocity remap
    pub velocity_target: f64,

    /// Lower clamp of the remapped velocity
    pub velocity_min: f64,

    /// Upper clamp of the remapped velocity
    pub velocity_max: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        SegmenterConfig {
            boundary_height: 0.002,
            peak_confidence: 0.2,
            min_note_duration: 0.06,
            merge_tolerance: 0.8,
            min_confidence: 0.5,
            velocity_target: 50.0,
            velocity_min: 20.0,
            velocity_max: 80.0,
        }
    }
}
