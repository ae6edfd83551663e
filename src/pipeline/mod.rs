// Transcription pipeline
// Orchestrates estimator -> segmentation -> tempo -> track encoding

use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::audio::{self, AudioError};
use crate::backend::{EstimatorError, NotationError, NotationGenerator, PitchEstimator};
use crate::midi::{self, EncodeError, TrackOptions};
use crate::notes::{self, NoteEvent, SegmenterConfig};
use crate::tempo::{self, TempoEstimator};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Estimator(#[from] EstimatorError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Notation(#[from] NotationError),

    #[error("Failed to prepare output directory: {0}")]
    OutputDir(std::io::Error),
}

/// Settings for one transcription run
///
/// All pipeline variants (alternate thresholds, optional notation output)
/// are expressed through this structure rather than separate code paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    pub segmenter: SegmenterConfig,
    pub track: TrackOptions,

    /// File name of the encoded track inside the output directory
    pub track_file_name: String,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        TranscriberConfig {
            segmenter: SegmenterConfig::default(),
            track: TrackOptions::default(),
            track_file_name: "output.mid".to_string(),
        }
    }
}

/// Output of a successful transcription
#[derive(Debug, Clone)]
pub struct Transcription {
    pub notes: Vec<NoteEvent>,
    pub bpm: u32,
    pub track_path: PathBuf,
    /// Present when a notation generator is configured
    pub document_path: Option<PathBuf>,
}

/// The full audio-to-track pipeline for one estimation backend
pub struct Transcriber {
    estimator: Box<dyn PitchEstimator>,
    tempo_chain: Vec<Box<dyn TempoEstimator>>,
    notation: Option<Box<dyn NotationGenerator>>,
    config: TranscriberConfig,
}

impl Transcriber {
    pub fn new(estimator: Box<dyn PitchEstimator>, config: TranscriberConfig) -> Self {
        Transcriber {
            estimator,
            tempo_chain: Vec::new(),
            notation: None,
            config,
        }
    }

    /// Append a tempo estimator to the fallback chain
    pub fn with_tempo_estimator(mut self, estimator: Box<dyn TempoEstimator>) -> Self {
        self.tempo_chain.push(estimator);
        self
    }

    /// Attach a notation document generator
    pub fn with_notation(mut self, generator: Box<dyn NotationGenerator>) -> Self {
        self.notation = Some(generator);
        self
    }

    /// Transcribe one audio file, writing the track (and optionally the
    /// notation document) into `output_dir`
    pub fn transcribe(&self, source: &Path, output_dir: &Path) -> Result<Transcription, PipelineError> {
        std::fs::create_dir_all(output_dir).map_err(PipelineError::OutputDir)?;

        let wave = audio::load_wav(source)?;
        info!(
            "Loaded {:.2} s of audio at {} Hz from {}",
            wave.duration(),
            wave.sample_rate,
            source.display()
        );

        let contour = self.estimator.estimate(source)?;
        info!(
            "Estimator {} produced {} frames (time step {} s)",
            self.estimator.name(),
            contour.len(),
            contour.time_step
        );

        let notes = notes::generate_notes(
            &contour,
            &wave.samples,
            wave.sample_rate,
            &self.config.segmenter,
        );
        info!("Segmentation produced {} notes", notes.len());

        let chain: Vec<&dyn TempoEstimator> =
            self.tempo_chain.iter().map(|e| e.as_ref()).collect();
        let bpm = tempo::resolve_tempo(&chain, source);

        let track = midi::encode_track(&notes, bpm, &self.config.track)?;
        let track_path = output_dir.join(&self.config.track_file_name);
        midi::write_midi_file(&track, &track_path)?;
        info!("Encoded track written to {}", track_path.display());

        let document_path = match &self.notation {
            Some(generator) => Some(generator.render(&track_path, output_dir)?),
            None => None,
        };

        Ok(Transcription {
            notes,
            bpm,
            track_path,
            document_path,
        })
    }
}
