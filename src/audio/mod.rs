// Audio ingestion module
// Reads WAV files into normalized mono f32 samples

use hound::{SampleFormat, WavReader};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to read WAV file: {0}")]
    WavRead(#[from] hound::Error),

    #[error("Failed to open audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
}

/// A mono waveform loaded from disk
#[derive(Debug, Clone)]
pub struct Waveform {
    /// Samples normalized to f32 in [-1.0, 1.0], mixed down to one channel
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Load a WAV file and mix it down to mono
pub fn load_wav(path: &Path) -> Result<Waveform, AudioError> {
    let file = std::fs::File::open(path)?;
    read_wav(std::io::BufReader::new(file))
}

/// Read a WAV stream into a mono waveform
pub fn read_wav<R: Read>(reader: R) -> Result<Waveform, AudioError> {
    let mut wav = WavReader::new(reader)?;
    let spec = wav.spec();

    // Normalize every supported encoding to f32 in [-1.0, 1.0]
    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => wav.samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = (1i64 << (bits - 1)) as f32;
            wav.samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{:?} {}-bit",
                format, bits
            )));
        }
    };

    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(Waveform {
        samples,
        sample_rate: spec.sample_rate,
    })
}
