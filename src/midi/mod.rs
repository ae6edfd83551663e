// Track encoding
// Converts the note list plus tempo into tick-accurate delta-timed events
// and writes them out as a standard MIDI file via midly

use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::notes::NoteEvent;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Tempo must be positive, got {0} bpm")]
    InvalidTempo(u32),

    #[error("Failed to write MIDI file: {0}")]
    Write(#[from] std::io::Error),
}

/// Track encoding options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackOptions {
    /// Pulses per quarter note; 480 gives comfortable timing resolution
    pub ticks_per_beat: u16,
}

impl Default for TrackOptions {
    fn default() -> Self {
        TrackOptions {
            ticks_per_beat: 480,
        }
    }
}

/// One delta-timed event in an encoded track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Ticks since the previous event in the track
    pub delta: u32,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8 },
}

/// A fully encoded single track
///
/// Summing deltas reconstructs each event's absolute tick position; ticks
/// derive from the tick resolution and the resolved tempo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedTrack {
    pub ticks_per_beat: u16,
    /// Microseconds per beat, derived from the integer BPM
    pub tempo: u32,
    pub events: Vec<TimedEvent>,
}

impl EncodedTrack {
    /// Seconds covered by one tick at this track's tempo and resolution
    pub fn seconds_per_tick(&self) -> f64 {
        self.tempo as f64 / 1_000_000.0 / self.ticks_per_beat as f64
    }
}

/// Encode a note list into delta-timed on/off events
///
/// Notes are assumed already onset-ordered; no re-sort happens here. Onset
/// deltas floor at 0 and offset deltas floor at 1 tick so no zero-duration
/// note is emitted. An empty note list encodes to a valid empty track.
pub fn encode_track(
    notes: &[NoteEvent],
    bpm: u32,
    options: &TrackOptions,
) -> Result<EncodedTrack, EncodeError> {
    if bpm == 0 {
        return Err(EncodeError::InvalidTempo(bpm));
    }
    let tempo = 60_000_000 / bpm;
    let ticks_per_second = (1_000_000.0 / tempo as f64) * options.ticks_per_beat as f64;

    let mut events = Vec::with_capacity(notes.len() * 2);
    let mut clock: i64 = 0;
    for note in notes {
        let onset_ticks = (note.onset * ticks_per_second) as i64;
        let offset_ticks = (note.offset * ticks_per_second) as i64;

        let velocity = note.velocity.clamp(0.0, 127.0) as u8;
        events.push(TimedEvent {
            delta: (onset_ticks - clock).max(0) as u32,
            kind: EventKind::NoteOn {
                pitch: note.pitch,
                velocity,
            },
        });
        events.push(TimedEvent {
            delta: (offset_ticks - onset_ticks).max(1) as u32,
            kind: EventKind::NoteOff { pitch: note.pitch },
        });
        clock = offset_ticks;
    }

    Ok(EncodedTrack {
        ticks_per_beat: options.ticks_per_beat,
        tempo,
        events,
    })
}

/// Lower an encoded track to a single-track SMF and write it to disk
pub fn write_midi_file(track: &EncodedTrack, path: &Path) -> Result<(), EncodeError> {
    let header = Header {
        format: Format::SingleTrack,
        timing: Timing::Metrical(track.ticks_per_beat.into()),
    };

    let mut events = Track::new();
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(track.tempo.into())),
    });
    for event in &track.events {
        let kind = match event.kind {
            EventKind::NoteOn { pitch, velocity } => TrackEventKind::Midi {
                channel: 0.into(),
                message: MidiMessage::NoteOn {
                    key: pitch.into(),
                    vel: velocity.into(),
                },
            },
            EventKind::NoteOff { pitch } => TrackEventKind::Midi {
                channel: 0.into(),
                message: MidiMessage::NoteOff {
                    key: pitch.into(),
                    vel: 0.into(),
                },
            },
        };
        events.push(TrackEvent {
            delta: event.delta.into(),
            kind,
        });
    }
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header,
        tracks: vec![events],
    };
    smf.save(path)?;
    Ok(())
}
