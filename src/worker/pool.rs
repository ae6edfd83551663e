// Worker pool
// Owns one long-lived subprocess per backend and its request/response channel

use log::{info, warn};
use std::collections::HashMap;
use std::io::{BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::backend::BackendKind;
use crate::worker::protocol::{self, Job, JobResult, ProtocolError};

/// Time workers get to exit after the terminate broadcast before being killed
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("No worker registered for backend {0}")]
    UnknownBackend(BackendKind),

    #[error("Failed to spawn worker process: {0}")]
    Spawn(std::io::Error),

    #[error("Worker channel error: {0}")]
    Channel(#[from] ProtocolError),
}

/// A running worker subprocess and its duplex channel
struct WorkerHandle {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Fixed registry of backend workers, coordinator-owned
///
/// Dispatch takes `&mut self`, which makes the one-in-flight discipline a
/// compile-time property: nobody can send a second Job on a channel before
/// the first Result has been read. Teardown broadcasts the terminate
/// sentinel and force-kills anything still alive after the grace period.
pub struct WorkerPool {
    workers: HashMap<BackendKind, WorkerHandle>,
    grace: Duration,
}

impl WorkerPool {
    /// Spawn one worker per requested backend from the current executable
    pub fn spawn(backends: &[BackendKind]) -> Result<Self, PoolError> {
        let exe = std::env::current_exe().map_err(PoolError::Spawn)?;
        Self::spawn_with(backends, |kind| {
            let mut cmd = Command::new(&exe);
            cmd.arg("worker").arg("--backend").arg(kind.as_str());
            cmd
        })
    }

    /// Spawn workers using a caller-supplied launcher per backend
    pub fn spawn_with<F>(backends: &[BackendKind], launcher: F) -> Result<Self, PoolError>
    where
        F: Fn(BackendKind) -> Command,
    {
        let mut workers = HashMap::new();
        for &kind in backends {
            let mut command = launcher(kind);
            let mut child = command
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .spawn()
                .map_err(PoolError::Spawn)?;

            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| PoolError::Spawn(std::io::Error::other("worker stdin not captured")))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| PoolError::Spawn(std::io::Error::other("worker stdout not captured")))?;

            info!("Spawned {} worker (pid {})", kind, child.id());
            workers.insert(
                kind,
                WorkerHandle {
                    child,
                    stdin,
                    stdout: BufReader::new(stdout),
                },
            );
        }
        Ok(WorkerPool {
            workers,
            grace: SHUTDOWN_GRACE,
        })
    }

    /// Backends with a registered worker
    pub fn backends(&self) -> impl Iterator<Item = BackendKind> + '_ {
        self.workers.keys().copied()
    }

    /// Override the shutdown grace period
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Send one Job to a backend's worker and block for its Result
    pub fn dispatch(&mut self, kind: BackendKind, job: &Job) -> Result<JobResult, PoolError> {
        let worker = self
            .workers
            .get_mut(&kind)
            .ok_or(PoolError::UnknownBackend(kind))?;

        protocol::send(&mut worker.stdin, job)?;
        let result = protocol::read_result(&mut worker.stdout)?;
        Ok(result)
    }

    /// Broadcast the terminate sentinel and reap every worker
    pub fn shutdown(mut self) {
        self.shutdown_workers();
    }

    fn shutdown_workers(&mut self) {
        if self.workers.is_empty() {
            return;
        }

        for (kind, worker) in &mut self.workers {
            if let Err(e) = protocol::send_terminate(&mut worker.stdin) {
                warn!("Terminate send to {} worker failed: {}", kind, e);
            }
            // Closing our end unblocks a worker stuck mid-read
            let _ = worker.stdin.flush();
        }

        let deadline = Instant::now() + self.grace;
        let mut pending: Vec<BackendKind> = self.workers.keys().copied().collect();
        while !pending.is_empty() && Instant::now() < deadline {
            pending.retain(|kind| match self.workers.get_mut(kind) {
                Some(worker) => match worker.child.try_wait() {
                    Ok(Some(status)) => {
                        info!("{} worker exited with {}", kind, status);
                        false
                    }
                    Ok(None) => true,
                    Err(e) => {
                        warn!("Wait on {} worker failed: {}", kind, e);
                        false
                    }
                },
                None => false,
            });
            if !pending.is_empty() {
                std::thread::sleep(Duration::from_millis(50));
            }
        }

        for kind in pending {
            if let Some(worker) = self.workers.get_mut(&kind) {
                warn!("{} worker missed the grace period, killing", kind);
                let _ = worker.child.kill();
                let _ = worker.child.wait();
            }
        }
        self.workers.clear();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown_workers();
    }
}
