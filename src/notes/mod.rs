// Note segmentation module
// Boundary detection, segment merging, and filtering into note events

pub mod boundaries;
pub mod filter;
pub mod merge;
pub mod types;

pub use boundaries::detect_segments;
pub use filter::filter_segments;
pub use merge::merge_segments;
pub use types::{NoteEvent, Segment, SegmenterConfig};

use crate::contour::PitchContour;

/// Run the full segmentation chain on one contour and its source waveform
///
/// Detect boundaries, merge, filter, normalize velocities. A degenerate
/// contour (all unvoiced, or one yielding no surviving segments) produces an
/// empty list, never an error.
pub fn generate_notes(
    contour: &PitchContour,
    samples: &[f32],
    sample_rate: u32,
    config: &SegmenterConfig,
) -> Vec<NoteEvent> {
    let pitch = contour.midi_pitch();
    let segments = detect_segments(contour, config);
    let merged = merge_segments(&segments, &pitch, contour.time_step, config);
    filter_segments(
        &merged,
        &pitch,
        &contour.confidence,
        samples,
        sample_rate,
        contour.time_step,
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 16_000;

    fn contour(f0: Vec<f64>, confidence: Vec<f64>) -> PitchContour {
        let n = f0.len();
        PitchContour {
            time: (0..n).map(|i| i as f64 * 0.01).collect(),
            f0,
            confidence,
            time_step: 0.01,
        }
    }

    fn steady_samples(frames: usize) -> Vec<f32> {
        vec![0.5; frames * (SR as f64 * 0.01) as usize]
    }

    #[test]
    fn test_two_note_scenario() {
        // A4 for 50 frames, 10 silent frames, A5 for 50 frames:
        // exactly two notes, the silent gap excluded.
        let mut f0 = vec![440.0; 50];
        f0.extend(vec![0.0; 10]);
        f0.extend(vec![880.0; 50]);
        let c = contour(f0, vec![0.9; 110]);
        let samples = steady_samples(110);

        let notes = generate_notes(&c, &samples, SR, &SegmenterConfig::default());

        assert_eq!(notes.len(), 2, "notes: {:?}", notes);
        assert_eq!(notes[0].pitch, 69);
        assert_eq!(notes[1].pitch, 81);
        assert!(notes[0].offset <= 0.5 + 1e-9);
        assert!(notes[1].onset >= 0.5 - 1e-9);
        for note in &notes {
            assert!(note.offset > note.onset);
        }
    }

    #[test]
    fn test_all_unvoiced_contour_yields_no_notes() {
        let c = contour(vec![0.0; 100], vec![0.9; 100]);
        let samples = steady_samples(100);
        let notes = generate_notes(&c, &samples, SR, &SegmenterConfig::default());
        assert!(notes.is_empty());
    }

    #[test]
    fn test_empty_contour_yields_no_notes() {
        let c = contour(vec![], vec![]);
        let notes = generate_notes(&c, &[], SR, &SegmenterConfig::default());
        assert!(notes.is_empty());
    }

    #[test]
    fn test_single_steady_tone() {
        let c = contour(vec![261.63; 80], vec![0.95; 80]);
        let samples = steady_samples(80);
        let notes = generate_notes(&c, &samples, SR, &SegmenterConfig::default());
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].pitch, 60); // middle C
    }
}
