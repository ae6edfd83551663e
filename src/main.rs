use clap::{Parser, Subcommand};
use log::error;
use std::path::PathBuf;

use cantus::backend::{BackendKind, CommandEstimator, CommandNotationGenerator};
use cantus::pipeline::{Transcriber, TranscriberConfig};
use cantus::tempo::CommandTempoEstimator;
use cantus::worker::{self, WorkerSettings};

/// Audio-to-score transcription engine
#[derive(Parser)]
#[command(name = "cantus")]
#[command(about = "Convert recorded audio to MIDI and notation via pitch contour segmentation")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe one audio file in-process
    Transcribe {
        /// Input audio file (WAV)
        input: PathBuf,

        /// Output directory for the track and notation document
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Estimation backend
        #[arg(short, long, default_value = "neural")]
        backend: String,

        /// Estimator command override
        #[arg(long)]
        estimator_cmd: Option<PathBuf>,

        /// Notation generator command; skipped when absent
        #[arg(long)]
        notation_cmd: Option<PathBuf>,

        /// Tempo estimator commands, tried in order before the 120 bpm default
        #[arg(long)]
        tempo_cmd: Vec<String>,
    },
    /// Run as a backend worker speaking the line-JSON protocol on stdin/stdout
    #[command(hide = true)]
    Worker {
        /// Backend this worker serves
        #[arg(long)]
        backend: String,

        /// Estimator command override
        #[arg(long)]
        estimator_cmd: Option<PathBuf>,

        /// Notation generator command
        #[arg(long)]
        notation_cmd: Option<PathBuf>,

        /// Tempo estimator commands forming the fallback chain
        #[arg(long)]
        tempo_cmd: Vec<PathBuf>,

        /// Directory job output directories are created under
        #[arg(long)]
        output_root: Option<PathBuf>,
    },
}

fn parse_backend(name: &str) -> BackendKind {
    BackendKind::from_str_loose(name).unwrap_or_else(|| {
        error!("Unknown backend '{}'", name);
        std::process::exit(2);
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Transcribe {
            input,
            output,
            backend,
            estimator_cmd,
            notation_cmd,
            tempo_cmd,
        } => {
            let kind = parse_backend(&backend);
            let estimator = match estimator_cmd {
                Some(cmd) => CommandEstimator::new(kind.as_str(), cmd),
                None => CommandEstimator::for_backend(kind),
            };

            let mut transcriber =
                Transcriber::new(Box::new(estimator), TranscriberConfig::default());
            for (i, cmd) in tempo_cmd.iter().enumerate() {
                transcriber = transcriber.with_tempo_estimator(Box::new(
                    CommandTempoEstimator::new(format!("tempo-{}", i), cmd.clone()),
                ));
            }
            if let Some(cmd) = notation_cmd {
                transcriber =
                    transcriber.with_notation(Box::new(CommandNotationGenerator::new(cmd)));
            }

            match transcriber.transcribe(&input, &output) {
                Ok(result) => {
                    println!("Notes: {}", result.notes.len());
                    println!("Tempo: {} bpm", result.bpm);
                    println!("Track: {}", result.track_path.display());
                    if let Some(doc) = result.document_path {
                        println!("Document: {}", doc.display());
                    }
                }
                Err(e) => {
                    error!("Transcription failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Worker {
            backend,
            estimator_cmd,
            notation_cmd,
            tempo_cmd,
            output_root,
        } => {
            let kind = parse_backend(&backend);
            let mut settings = WorkerSettings {
                estimator_cmd,
                notation_cmd,
                tempo_cmds: tempo_cmd,
                ..WorkerSettings::default()
            };
            if let Some(root) = output_root {
                settings.output_root = root;
            }

            if let Err(e) = worker::run_worker(kind, settings) {
                error!("Worker channel failure: {}", e);
                std::process::exit(1);
            }
        }
    }
}
