// Cantus - audio-to-score transcription engine
// Segments a pitch contour into note events, encodes them as a MIDI track,
// and runs estimation backends in isolated worker subprocesses

pub mod audio;
pub mod backend;
pub mod contour;
pub mod midi;
pub mod notes;
pub mod pipeline;
pub mod tempo;
pub mod worker;

pub use backend::{BackendKind, CommandEstimator, PitchEstimator};
pub use contour::PitchContour;
pub use midi::{encode_track, EncodedTrack, TrackOptions};
pub use notes::{generate_notes, NoteEvent, Segment, SegmenterConfig};
pub use pipeline::{Transcriber, TranscriberConfig, Transcription};
pub use tempo::{resolve_tempo, TempoEstimator, DEFAULT_BPM};
pub use worker::{Job, JobResult, WorkerPool};
