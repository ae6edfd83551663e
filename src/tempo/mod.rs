// Tempo resolution
// Walks a fallback chain of estimators down to a fixed default BPM

use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// BPM used when every estimator in the chain fails
pub const DEFAULT_BPM: u32 = 120;

#[derive(Debug, Error)]
pub enum TempoError {
    #[error("Tempo estimator failed to run: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Tempo estimator exited with status {0}")]
    Failed(String),

    #[error("Tempo estimator produced unparseable output: {0:?}")]
    BadOutput(String),
}

/// A beat-tracking estimator producing a single BPM value for an audio source
///
/// Estimators are external collaborators; the resolver only consumes the
/// returned number or the failure.
pub trait TempoEstimator {
    fn estimate_bpm(&self, source: &Path) -> Result<f64, TempoError>;

    /// Short name used in log output
    fn name(&self) -> &str;
}

/// Resolve a tempo through an ordered estimator chain
///
/// Each step is tried only if the previous one failed or returned a
/// non-positive BPM; an estimator error is recovery fuel, never fatal. The
/// chain always terminates at the fixed default, so the result is always a
/// positive integer BPM, rounded to nearest.
pub fn resolve_tempo(estimators: &[&dyn TempoEstimator], source: &Path) -> u32 {
    for estimator in estimators {
        match estimator.estimate_bpm(source) {
            Ok(bpm) if bpm > 0.0 => {
                let rounded = bpm.round() as u32;
                info!("Tempo from {}: {} bpm", estimator.name(), rounded);
                return rounded;
            }
            Ok(bpm) => {
                warn!(
                    "Tempo estimator {} returned non-positive bpm {}, falling back",
                    estimator.name(),
                    bpm
                );
            }
            Err(e) => {
                warn!(
                    "Tempo estimator {} failed ({}), falling back",
                    estimator.name(),
                    e
                );
            }
        }
    }
    info!("Tempo resolved to default {} bpm", DEFAULT_BPM);
    DEFAULT_BPM
}

/// Estimator backed by an external command printing a BPM number on stdout
///
/// When a fixed `sample` path is configured, the command analyzes that clip
/// instead of the caller's audio. This mirrors the observed behavior of the
/// secondary fallback in production, which loads its own bundled sample.
#[derive(Debug, Clone)]
pub struct CommandTempoEstimator {
    name: String,
    program: String,
    sample: Option<PathBuf>,
}

impl CommandTempoEstimator {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        CommandTempoEstimator {
            name: name.into(),
            program: program.into(),
            sample: None,
        }
    }

    /// Pin the estimator to a fixed audio sample, ignoring the caller's path
    pub fn with_sample(mut self, sample: PathBuf) -> Self {
        self.sample = Some(sample);
        self
    }
}

impl TempoEstimator for CommandTempoEstimator {
    fn estimate_bpm(&self, source: &Path) -> Result<f64, TempoError> {
        let target = self.sample.as_deref().unwrap_or(source);
        let output = Command::new(&self.program).arg(target).output()?;
        if !output.status.success() {
            return Err(TempoError::Failed(output.status.to_string()));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let trimmed = text.trim();
        trimmed
            .parse::<f64>()
            .map_err(|_| TempoError::BadOutput(trimmed.to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
