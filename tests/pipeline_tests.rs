// End-to-end pipeline tests: contour in, MIDI file out

use std::path::Path;

use cantus::backend::{EstimatorError, PitchEstimator};
use cantus::contour::PitchContour;
use cantus::pipeline::{Transcriber, TranscriberConfig};

struct FixtureEstimator {
    contour: PitchContour,
}

impl PitchEstimator for FixtureEstimator {
    fn estimate(&self, _source: &Path) -> Result<PitchContour, EstimatorError> {
        Ok(self.contour.clone())
    }
    fn name(&self) -> &str {
        "fixture"
    }
}

fn contour(f0: Vec<f64>, confidence: Vec<f64>) -> PitchContour {
    let n = f0.len();
    PitchContour {
        time: (0..n).map(|i| i as f64 * 0.01).collect(),
        f0,
        confidence,
        time_step: 0.01,
    }
}

/// Write a mono 16 kHz WAV: 0.5 s of A4, 0.1 s of silence, 0.5 s of A5
fn write_two_tone_wav(path: &Path) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let mut write_tone = |hz: f64, seconds: f64| {
        let total = (seconds * 16_000.0) as usize;
        for i in 0..total {
            let t = i as f64 / 16_000.0;
            let value = if hz > 0.0 {
                0.5 * (2.0 * std::f64::consts::PI * hz * t).sin()
            } else {
                0.0
            };
            writer.write_sample((value * 32767.0) as i16).unwrap();
        }
    };
    write_tone(440.0, 0.5);
    write_tone(0.0, 0.1);
    write_tone(880.0, 0.5);
    writer.finalize().unwrap();
}

fn two_note_contour() -> PitchContour {
    let mut f0 = vec![440.0; 50];
    f0.extend(vec![0.0; 10]);
    f0.extend(vec![880.0; 50]);
    contour(f0, vec![0.9; 110])
}

#[test]
fn test_two_tone_scenario_produces_two_notes() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("take.wav");
    write_two_tone_wav(&wav);

    let transcriber = Transcriber::new(
        Box::new(FixtureEstimator {
            contour: two_note_contour(),
        }),
        TranscriberConfig::default(),
    );

    let result = transcriber.transcribe(&wav, &dir.path().join("out")).unwrap();

    assert_eq!(result.notes.len(), 2);
    assert_eq!(result.notes[0].pitch, 69);
    assert_eq!(result.notes[1].pitch, 81);
    // The silent gap stays out of both notes
    assert!(result.notes[0].offset <= 0.5 + 1e-9);
    assert!(result.notes[1].onset >= 0.5 - 1e-9);
}

#[test]
fn test_track_timing_survives_midi_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("take.wav");
    write_two_tone_wav(&wav);

    let transcriber = Transcriber::new(
        Box::new(FixtureEstimator {
            contour: two_note_contour(),
        }),
        TranscriberConfig::default(),
    );
    let result = transcriber.transcribe(&wav, &dir.path().join("out")).unwrap();

    let bytes = std::fs::read(&result.track_path).unwrap();
    let smf = midly::Smf::parse(&bytes).unwrap();
    assert_eq!(smf.tracks.len(), 1);

    // Decode absolute tick positions of note-on events and convert back to
    // seconds; each must land within one tick of the source note onset.
    let ticks_per_beat = match smf.header.timing {
        midly::Timing::Metrical(t) => u16::from(t) as f64,
        _ => panic!("expected metrical timing"),
    };
    let tempo = 60_000_000.0 / result.bpm as f64;
    let seconds_per_tick = tempo / 1_000_000.0 / ticks_per_beat;

    let mut clock = 0u64;
    let mut onsets = Vec::new();
    for event in &smf.tracks[0] {
        clock += u32::from(event.delta) as u64;
        if let midly::TrackEventKind::Midi {
            message: midly::MidiMessage::NoteOn { .. },
            ..
        } = event.kind
        {
            onsets.push(clock as f64 * seconds_per_tick);
        }
    }

    assert_eq!(onsets.len(), 2);
    for (got, note) in onsets.iter().zip(result.notes.iter()) {
        assert!(
            (got - note.onset).abs() <= seconds_per_tick,
            "onset {} reconstructed as {}",
            note.onset,
            got
        );
    }
}

#[test]
fn test_all_unvoiced_contour_yields_empty_valid_track() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("take.wav");
    write_two_tone_wav(&wav);

    let transcriber = Transcriber::new(
        Box::new(FixtureEstimator {
            contour: contour(vec![0.0; 110], vec![0.9; 110]),
        }),
        TranscriberConfig::default(),
    );
    let result = transcriber.transcribe(&wav, &dir.path().join("out")).unwrap();

    assert!(result.notes.is_empty());
    assert!(result.track_path.exists());

    let bytes = std::fs::read(&result.track_path).unwrap();
    let smf = midly::Smf::parse(&bytes).unwrap();
    let note_events = smf.tracks[0]
        .iter()
        .filter(|e| matches!(e.kind, midly::TrackEventKind::Midi { .. }))
        .count();
    assert_eq!(note_events, 0);
}

#[test]
fn test_velocities_land_in_configured_range() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("take.wav");
    write_two_tone_wav(&wav);

    let transcriber = Transcriber::new(
        Box::new(FixtureEstimator {
            contour: two_note_contour(),
        }),
        TranscriberConfig::default(),
    );
    let result = transcriber.transcribe(&wav, &dir.path().join("out")).unwrap();

    for note in &result.notes {
        assert!(note.velocity >= 20.0 && note.velocity <= 80.0);
    }
}
