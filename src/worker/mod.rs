// Worker isolation layer
// Long-lived backend subprocesses behind a request/response channel

pub mod pool;
pub mod protocol;
pub mod runner;

pub use pool::{PoolError, WorkerPool, SHUTDOWN_GRACE};
pub use protocol::{Job, JobFlags, JobResult, ProtocolError};
pub use runner::{run_worker, serve, WorkerSettings};
