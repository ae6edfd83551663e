// Worker wire protocol
// One JSON document per line over the worker's duplex channel

use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Channel I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed protocol message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Channel closed by peer")]
    Closed,
}

/// Optional per-job processing flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFlags {
    /// Output directory override; workers pick their own when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

/// A transcription request sent to a worker
///
/// The terminate signal is not a Job variant but a JSON `null` on the wire,
/// so callers built against the original channel format keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub source_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<JobFlags>,
}

impl Job {
    pub fn new(source_path: impl Into<String>) -> Self {
        Job {
            source_path: source_path.into(),
            flags: None,
        }
    }
}

/// A worker's reply to one Job
///
/// Success carries the notation-document path and the encoded-track path.
/// Both paths empty is the failure sentinel; the pairing and the
/// empty-string convention are fixed wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub document_path: String,
    pub track_path: String,
}

impl JobResult {
    pub fn failure() -> Self {
        JobResult {
            document_path: String::new(),
            track_path: String::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.document_path.is_empty() && self.track_path.is_empty()
    }
}

/// Write one message as a single JSON line and flush
pub fn send<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<(), ProtocolError> {
    let json = serde_json::to_string(message)?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write the terminate sentinel (a bare JSON `null`)
pub fn send_terminate<W: Write>(writer: &mut W) -> Result<(), ProtocolError> {
    send(writer, &None::<Job>)
}

/// Read the next Job, `Ok(None)` meaning the terminate sentinel
///
/// EOF on the channel is treated like a terminate: the peer is gone and the
/// worker should wind down rather than error out.
pub fn read_job<R: BufRead>(reader: &mut R) -> Result<Option<Job>, ProtocolError> {
    match read_line(reader)? {
        Some(line) => Ok(serde_json::from_str::<Option<Job>>(&line)?),
        None => Ok(None),
    }
}

/// Read the next JobResult; EOF means the worker died mid-exchange
pub fn read_result<R: BufRead>(reader: &mut R) -> Result<JobResult, ProtocolError> {
    match read_line(reader)? {
        Some(line) => Ok(serde_json::from_str(&line)?),
        None => Err(ProtocolError::Closed),
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, ProtocolError> {
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        if !line.trim().is_empty() {
            return Ok(Some(line));
        }
    }
}
