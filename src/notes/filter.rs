// Segment filtering and velocity normalization
// Drops spurious segments and rescales amplitudes into a bounded velocity range

use crate::contour::{nan_mean, nan_median};
use crate::notes::types::{NoteEvent, Segment, SegmenterConfig};

/// A merged segment annotated with the statistics the filter decides on
struct Candidate {
    segment: Segment,
    pitch: f64,
    amplitude: f64,
}

/// Filter merged segments and emit the final note list
///
/// Stages, in order:
/// 1. drop segments whose median confidence is below the cutoff or whose
///    waveform slice is empty;
/// 2. compute the velocity threshold once, as the mean peak amplitude of the
///    remaining candidates divided by 20;
/// 3. drop candidates below that threshold or shorter than the minimum note
///    duration;
/// 4. remap peak amplitudes so their mean hits the velocity target, then
///    clamp into the configured range.
///
/// Zero survivors is a valid outcome and yields an empty list.
pub fn filter_segments(
    segments: &[Segment],
    pitch: &[f64],
    confidence: &[f64],
    samples: &[f32],
    sample_rate: u32,
    time_step: f64,
    config: &SegmenterConfig,
) -> Vec<NoteEvent> {
    let mut candidates = Vec::with_capacity(segments.len());
    for &seg in segments {
        if nan_median(&confidence[seg.start..seg.end]) < config.min_confidence {
            continue;
        }
        let Some(amplitude) = peak_amplitude(seg, samples, sample_rate, time_step) else {
            continue;
        };
        let median_pitch = nan_median(&pitch[seg.start..seg.end]);
        if median_pitch.is_nan() {
            // Confident but entirely unvoiced: no pitch to assign
            continue;
        }
        candidates.push(Candidate {
            segment: seg,
            pitch: median_pitch,
            amplitude,
        });
    }

    if candidates.is_empty() {
        return Vec::new();
    }

    let amplitudes: Vec<f64> = candidates.iter().map(|c| c.amplitude).collect();
    let velocity_threshold = nan_mean(&amplitudes) / 20.0;

    let notes: Vec<NoteEvent> = candidates
        .into_iter()
        .filter(|c| {
            c.amplitude >= velocity_threshold
                && c.segment.duration(time_step) >= config.min_note_duration
        })
        .map(|c| NoteEvent {
            onset: c.segment.start as f64 * time_step,
            offset: c.segment.end as f64 * time_step,
            pitch: round_pitch(c.pitch),
            velocity: c.amplitude,
        })
        .collect();

    normalize_velocities(notes, config)
}

/// Peak absolute amplitude of the waveform slice a segment covers
/// Returns None when the slice falls outside the waveform or is empty
fn peak_amplitude(
    seg: Segment,
    samples: &[f32],
    sample_rate: u32,
    time_step: f64,
) -> Option<f64> {
    let scale = sample_rate as f64 * time_step;
    let start = ((seg.start as f64 * scale) as usize).min(samples.len());
    let end = ((seg.end as f64 * scale) as usize).min(samples.len());
    if start >= end {
        return None;
    }
    let peak = samples[start..end]
        .iter()
        .map(|s| s.abs() as f64)
        .fold(0.0, f64::max);
    Some(peak)
}

/// Round a fractional MIDI pitch to the nearest valid integer semitone
fn round_pitch(pitch: f64) -> u8 {
    pitch.round().clamp(0.0, 127.0) as u8
}

/// Rescale velocities so their mean equals the target, then clamp
fn normalize_velocities(mut notes: Vec<NoteEvent>, config: &SegmenterConfig) -> Vec<NoteEvent> {
    let raw: Vec<f64> = notes.iter().map(|n| n.velocity).collect();
    let old_mean = nan_mean(&raw);
    if !(old_mean > 0.0) {
        return notes;
    }
    for note in &mut notes {
        let remapped = note.velocity * config.velocity_target / old_mean;
        note.velocity = remapped.clamp(config.velocity_min, config.velocity_max);
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 16_000;
    const STEP: f64 = 0.01;

    /// Waveform with a constant amplitude per 0.01 s frame
    fn samples_for_frames(frame_amps: &[f32]) -> Vec<f32> {
        let per_frame = (SR as f64 * STEP) as usize;
        let mut samples = Vec::with_capacity(frame_amps.len() * per_frame);
        for &amp in frame_amps {
            samples.extend(std::iter::repeat(amp).take(per_frame));
        }
        samples
    }

    fn run(
        segments: &[Segment],
        pitch: &[f64],
        confidence: &[f64],
        samples: &[f32],
    ) -> Vec<NoteEvent> {
        filter_segments(
            segments,
            pitch,
            confidence,
            samples,
            SR,
            STEP,
            &SegmenterConfig::default(),
        )
    }

    #[test]
    fn test_low_confidence_segment_dropped() {
        let segments = vec![Segment::new(0, 20), Segment::new(20, 40)];
        let pitch = vec![69.0; 40];
        let mut confidence = vec![0.9; 20];
        confidence.extend(vec![0.3; 20]);
        let samples = samples_for_frames(&[0.5; 40]);

        let notes = run(&segments, &pitch, &confidence, &samples);
        assert_eq!(notes.len(), 1);
        assert!((notes[0].onset - 0.0).abs() < 1e-9);
        assert!((notes[0].offset - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_quiet_segment_dropped() {
        let segments = vec![Segment::new(0, 20), Segment::new(20, 40)];
        let pitch = vec![69.0; 40];
        let confidence = vec![0.9; 40];
        // Second segment is 100x quieter than the first; the threshold is
        // mean(0.8, 0.008)/20 = 0.0202, above the quiet segment's peak.
        let mut frame_amps = vec![0.8f32; 20];
        frame_amps.extend(vec![0.008f32; 20]);
        let samples = samples_for_frames(&frame_amps);

        let notes = run(&segments, &pitch, &confidence, &samples);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].pitch, 69);
    }

    #[test]
    fn test_short_segment_dropped() {
        // 4 frames = 0.04 s, under the 0.06 s minimum
        let segments = vec![Segment::new(0, 4), Segment::new(4, 40)];
        let pitch = vec![69.0; 40];
        let confidence = vec![0.9; 40];
        let samples = samples_for_frames(&[0.5; 40]);

        let notes = run(&segments, &pitch, &confidence, &samples);
        assert_eq!(notes.len(), 1);
        assert!((notes[0].onset - 0.04).abs() < 1e-9);
    }

    #[test]
    fn test_unvoiced_segment_dropped() {
        let segments = vec![Segment::new(0, 20)];
        let pitch = vec![f64::NAN; 20];
        let confidence = vec![0.9; 20];
        let samples = samples_for_frames(&[0.5; 20]);

        let notes = run(&segments, &pitch, &confidence, &samples);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_no_survivors_yields_empty_list() {
        let segments = vec![Segment::new(0, 20)];
        let pitch = vec![69.0; 20];
        let confidence = vec![0.1; 20];
        let samples = samples_for_frames(&[0.5; 20]);

        let notes = run(&segments, &pitch, &confidence, &samples);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_segment_beyond_waveform_dropped() {
        // Segment maps past the end of a waveform shorter than the contour
        let segments = vec![Segment::new(0, 20), Segment::new(20, 40)];
        let pitch = vec![69.0; 40];
        let confidence = vec![0.9; 40];
        let samples = samples_for_frames(&[0.5; 20]);

        let notes = run(&segments, &pitch, &confidence, &samples);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn test_velocity_mean_hits_target() {
        let segments = vec![
            Segment::new(0, 20),
            Segment::new(20, 40),
            Segment::new(40, 60),
        ];
        let pitch = vec![69.0; 60];
        let confidence = vec![0.9; 60];
        let mut frame_amps = vec![0.4f32; 20];
        frame_amps.extend(vec![0.5f32; 20]);
        frame_amps.extend(vec![0.6f32; 20]);
        let samples = samples_for_frames(&frame_amps);

        let notes = run(&segments, &pitch, &confidence, &samples);
        assert_eq!(notes.len(), 3);
        // Raw peaks 0.4/0.5/0.6 remap to 40/50/60: nothing clamps and the
        // mean lands exactly on the target.
        let mean: f64 = notes.iter().map(|n| n.velocity).sum::<f64>() / notes.len() as f64;
        assert!((mean - 50.0).abs() < 1e-6);
        assert!((notes[0].velocity - 40.0).abs() < 1e-6);
        assert!((notes[2].velocity - 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_velocities_clamped_to_range() {
        let segments = vec![Segment::new(0, 20), Segment::new(20, 40)];
        let pitch = vec![69.0; 40];
        let confidence = vec![0.9; 40];
        // 10x amplitude spread forces clamping at both ends after the remap
        let mut frame_amps = vec![0.09f32; 20];
        frame_amps.extend(vec![0.9f32; 20]);
        let samples = samples_for_frames(&frame_amps);

        let notes = run(&segments, &pitch, &confidence, &samples);
        assert_eq!(notes.len(), 2);
        for note in &notes {
            assert!(note.velocity >= 20.0 && note.velocity <= 80.0);
        }
        assert_eq!(notes[0].velocity, 20.0);
        assert_eq!(notes[1].velocity, 80.0);
    }

    #[test]
    fn test_filter_is_idempotent_on_surviving_segments() {
        let segments = vec![
            Segment::new(0, 20),
            Segment::new(20, 40),
            Segment::new(40, 44),
            Segment::new(44, 64),
        ];
        let pitch = vec![69.0; 64];
        let mut confidence = vec![0.9; 40];
        confidence.extend(vec![0.2; 4]);
        confidence.extend(vec![0.9; 20]);
        let mut frame_amps = vec![0.5f32; 20];
        frame_amps.extend(vec![0.6f32; 20]);
        frame_amps.extend(vec![0.5f32; 4]);
        frame_amps.extend(vec![0.4f32; 20]);
        let samples = samples_for_frames(&frame_amps);

        let notes = run(&segments, &pitch, &confidence, &samples);
        let survivors: Vec<Segment> = notes
            .iter()
            .map(|n| {
                Segment::new(
                    (n.onset / STEP).round() as usize,
                    (n.offset / STEP).round() as usize,
                )
            })
            .collect();

        let refiltered = run(&survivors, &pitch, &confidence, &samples);
        assert_eq!(refiltered.len(), notes.len());
    }
}
