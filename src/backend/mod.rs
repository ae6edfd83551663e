// Estimation backend abstraction
// Each backend is an interchangeable external pitch estimator reached
// through a command contract; the estimator itself stays a black box

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use crate::contour::{ContourError, PitchContour};

/// Available estimation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Neural monophonic pitch tracker
    Neural,

    /// Signal-processing predominant-melody extractor
    Spectral,

    /// Neural polyphonic note estimator
    Polyphonic,
}

impl BackendKind {
    /// Every known backend, in dispatch-registry order
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Neural,
        BackendKind::Spectral,
        BackendKind::Polyphonic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Neural => "neural",
            BackendKind::Spectral => "spectral",
            BackendKind::Polyphonic => "polyphonic",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "neural" => Some(BackendKind::Neural),
            "spectral" => Some(BackendKind::Spectral),
            "polyphonic" => Some(BackendKind::Polyphonic),
            _ => None,
        }
    }

    /// Default external estimator command for this backend
    pub fn default_command(&self) -> &'static str {
        match self {
            BackendKind::Neural => "cantus-estimate-neural",
            BackendKind::Spectral => "cantus-estimate-spectral",
            BackendKind::Polyphonic => "cantus-estimate-polyphonic",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while obtaining a contour from an estimator
#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("Estimator failed to run: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Estimator exited with status {0}")]
    Failed(String),

    #[error("Estimator produced invalid contour JSON: {0}")]
    BadContour(#[from] serde_json::Error),

    #[error("Estimator produced malformed contour: {0}")]
    Malformed(#[from] ContourError),
}

/// A pitch/confidence estimator mapping an audio source to a contour
pub trait PitchEstimator {
    fn estimate(&self, source: &Path) -> Result<PitchContour, EstimatorError>;

    /// Short name used in log output
    fn name(&self) -> &str;
}

/// Estimator backed by an external command
///
/// The command receives the audio path as its sole argument and prints a
/// JSON contour `{"time": [...], "f0": [...], "confidence": [...],
/// "time_step": ...}` on stdout.
#[derive(Debug, Clone)]
pub struct CommandEstimator {
    name: String,
    program: PathBuf,
}

impl CommandEstimator {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        CommandEstimator {
            name: name.into(),
            program: program.into(),
        }
    }

    /// Estimator wired to a backend's default command
    pub fn for_backend(kind: BackendKind) -> Self {
        Self::new(kind.as_str(), kind.default_command())
    }
}

impl PitchEstimator for CommandEstimator {
    fn estimate(&self, source: &Path) -> Result<PitchContour, EstimatorError> {
        let output = Command::new(&self.program).arg(source).output()?;
        if !output.status.success() {
            return Err(EstimatorError::Failed(output.status.to_string()));
        }
        let contour: PitchContour = serde_json::from_slice(&output.stdout)?;
        contour.validate()?;
        Ok(contour)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Errors raised while rendering a notation document
#[derive(Debug, Error)]
pub enum NotationError {
    #[error("Notation generator failed to run: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Notation generator exited with status {0}")]
    Failed(String),

    #[error("Notation generator reported no output path")]
    NoOutput,
}

/// Renders an encoded track file to a human-readable notation document
///
/// The produced document is never parsed or validated here.
pub trait NotationGenerator {
    fn render(&self, track_path: &Path, output_dir: &Path) -> Result<PathBuf, NotationError>;
}

/// Generator backed by an external command
///
/// Invoked as `<program> <track-path> <output-path>`; the output document
/// lands at the path this side chooses.
#[derive(Debug, Clone)]
pub struct CommandNotationGenerator {
    program: PathBuf,
}

impl CommandNotationGenerator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandNotationGenerator {
            program: program.into(),
        }
    }
}

impl NotationGenerator for CommandNotationGenerator {
    fn render(&self, track_path: &Path, output_dir: &Path) -> Result<PathBuf, NotationError> {
        let document = output_dir.join("output.musicxml");
        let status = Command::new(&self.program)
            .arg(track_path)
            .arg(&document)
            .status()?;
        if !status.success() {
            return Err(NotationError::Failed(status.to_string()));
        }
        if !document.exists() {
            return Err(NotationError::NoOutput);
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_round_trip() {
        for kind in BackendKind::ALL {
            assert_eq!(BackendKind::from_str_loose(kind.as_str()), Some(kind));
        }
        assert_eq!(BackendKind::from_str_loose("unknown"), None);
    }

    #[test]
    fn test_command_estimator_missing_program() {
        let est = CommandEstimator::new("missing", "/nonexistent/estimator");
        let result = est.estimate(Path::new("in.wav"));
        assert!(matches!(result, Err(EstimatorError::Spawn(_))));
    }

    #[test]
    fn test_command_estimator_parses_contour() {
        // `echo` prints its argument back, which is enough to exercise the
        // JSON contract: feed it a contour document as the "audio path".
        let est = CommandEstimator::new("echo", "/bin/echo");
        let json = r#"{"time":[0.0,0.01],"f0":[440.0,440.0],"confidence":[0.9,0.9],"time_step":0.01}"#;
        let contour = est.estimate(Path::new(json)).unwrap();
        assert_eq!(contour.len(), 2);
        assert_eq!(contour.time_step, 0.01);
    }

    #[test]
    fn test_command_estimator_rejects_mismatched_contour() {
        let est = CommandEstimator::new("echo", "/bin/echo");
        let json = r#"{"time":[0.0],"f0":[440.0,880.0],"confidence":[0.9],"time_step":0.01}"#;
        let result = est.estimate(Path::new(json));
        assert!(matches!(result, Err(EstimatorError::Malformed(_))));
    }

    #[test]
    fn test_notation_generator_missing_program() {
        let generator = CommandNotationGenerator::new("/nonexistent/renderer");
        let result = generator.render(Path::new("track.mid"), Path::new("/tmp"));
        assert!(matches!(result, Err(NotationError::Spawn(_))));
    }
}
