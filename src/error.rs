//! Error types shared by the controller and the algorithm implementations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong when driving an online clustering run.
///
/// Control-path errors are returned to the caller and leave the status
/// untouched; worker-path errors (iteration, initialization, timeout, panic)
/// move the controller to `Finished` with the error attached.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The operation needs centroids but the model was never initialized.
    #[error("the algorithm has not started")]
    NotStarted,
    /// `init` was called on an already initialized controller.
    #[error("the algorithm is already initialized")]
    AlreadyCreated,
    /// `play` was called while the worker is running.
    #[error("the algorithm is already running")]
    AlreadyRunning,
    /// The operation requires a running worker.
    #[error("the algorithm is not running")]
    NotRunning,
    /// `stop` was called on a controller that is not alive.
    #[error("the algorithm is not alive")]
    NotAlive,
    /// `wait` was called while the worker is paused.
    #[error("the algorithm is idle")]
    Idle,
    /// No termination criterion exists, so waiting would block forever.
    #[error(
        "the algorithm can never converge: set iter, iter_per_data, \
         data_per_iter, timeout or a finishing predicate"
    )]
    NeverConverge,
    /// The run exceeded its wall-clock budget.
    #[error("the algorithm timed out")]
    Timeout,
    /// The implementation rejected a pushed element.
    #[error("the implementation buffer is full")]
    BufferFull,
    /// Initialization could not seed the requested number of centroids.
    #[error("not enough data to initialize the centroids")]
    NotEnoughData,
    /// Configuration verification failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Opaque failure surfaced by an implementation during `iterate`.
    #[error("implementation failure: {0}")]
    Implementation(String),
}
