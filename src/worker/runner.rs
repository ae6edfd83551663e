// Worker serve loop
// Runs the pipeline job-by-job, turning every failure into the sentinel reply

use log::{error, info};
use std::io::{BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use crate::backend::{BackendKind, CommandEstimator, CommandNotationGenerator};
use crate::pipeline::{Transcriber, TranscriberConfig};
use crate::tempo::CommandTempoEstimator;
use crate::worker::protocol::{self, Job, JobResult, ProtocolError};

/// How a worker assembles its pipeline and where job output lands
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// External estimator command; backend default when absent
    pub estimator_cmd: Option<PathBuf>,

    /// External notation generator command; no document is produced when absent
    pub notation_cmd: Option<PathBuf>,

    /// External tempo estimator commands forming the fallback chain
    pub tempo_cmds: Vec<PathBuf>,

    /// Directory job output directories are created under
    pub output_root: PathBuf,

    pub config: TranscriberConfig,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings {
            estimator_cmd: None,
            notation_cmd: None,
            tempo_cmds: Vec::new(),
            output_root: std::env::temp_dir(),
            config: TranscriberConfig::default(),
        }
    }
}

/// Run a backend worker over stdin/stdout until the terminate sentinel
pub fn run_worker(kind: BackendKind, settings: WorkerSettings) -> Result<(), ProtocolError> {
    let transcriber = build_transcriber(kind, &settings);
    let output_root = settings.output_root.join(format!("{}_output", kind));

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    info!("Worker for backend {} ready", kind);
    serve(&mut stdin.lock(), &mut stdout.lock(), |job| {
        run_job(&transcriber, &output_root, job)
    })
}

fn build_transcriber(kind: BackendKind, settings: &WorkerSettings) -> Transcriber {
    let estimator = match &settings.estimator_cmd {
        Some(cmd) => CommandEstimator::new(kind.as_str(), cmd.clone()),
        None => CommandEstimator::for_backend(kind),
    };

    let mut transcriber = Transcriber::new(Box::new(estimator), settings.config.clone());
    for (i, cmd) in settings.tempo_cmds.iter().enumerate() {
        let name = format!("tempo-{}", i);
        transcriber = transcriber.with_tempo_estimator(Box::new(CommandTempoEstimator::new(
            name,
            cmd.to_string_lossy().into_owned(),
        )));
    }
    if let Some(cmd) = &settings.notation_cmd {
        transcriber = transcriber.with_notation(Box::new(CommandNotationGenerator::new(cmd.clone())));
    }
    transcriber
}

fn run_job(transcriber: &Transcriber, output_root: &Path, job: &Job) -> JobResult {
    let output_dir = job
        .flags
        .as_ref()
        .and_then(|f| f.output_dir.as_ref())
        .map(PathBuf::from)
        .unwrap_or_else(|| output_root.to_path_buf());

    match transcriber.transcribe(Path::new(&job.source_path), &output_dir) {
        Ok(result) => JobResult {
            document_path: result
                .document_path
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            track_path: result.track_path.to_string_lossy().into_owned(),
        },
        Err(e) => {
            error!("Job for {} failed: {}", job.source_path, e);
            JobResult::failure()
        }
    }
}

/// Process jobs from `input` until the terminate sentinel or EOF
///
/// Each non-sentinel Job gets exactly one JobResult reply. A panicking
/// handler is caught and reported as the failure sentinel; a single bad job
/// must never take the worker down with it.
pub fn serve<R, W, F>(input: &mut R, output: &mut W, mut handler: F) -> Result<(), ProtocolError>
where
    R: BufRead,
    W: Write,
    F: FnMut(&Job) -> JobResult,
{
    loop {
        let job = match protocol::read_job(input) {
            Ok(Some(job)) => job,
            Ok(None) => {
                info!("Terminate sentinel received, worker exiting");
                return Ok(());
            }
            Err(ProtocolError::Decode(e)) => {
                // An unreadable request still deserves a reply, or the
                // coordinator would block forever waiting for one.
                error!("Dropping malformed job: {}", e);
                protocol::send(output, &JobResult::failure())?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| handler(&job))).unwrap_or_else(|_| {
            error!("Job handler panicked on {}", job.source_path);
            JobResult::failure()
        });

        protocol::send(output, &result)?;
    }
}
