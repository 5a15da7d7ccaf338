use std::fmt;

use crate::error::Error;

/// Execution status of a controller.
///
/// `Finished` carries the error that ended the run, if any, so observers can
/// never pair a live state with a stale error.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Status {
    /// Initial state, no centroids yet.
    #[default]
    Created,
    /// `init` is producing the starting centroids.
    Initializing,
    /// Initialized but no worker is running.
    Ready,
    /// The worker is iterating.
    Running,
    /// The worker is parked by `pause` and resumes on `play`.
    Idle,
    /// The worker exited, successfully or with the given error.
    Finished(Option<Error>),
}

impl Status {
    /// True while a worker exists: initializing, running or idle.
    pub fn alive(&self) -> bool {
        matches!(self, Status::Initializing | Status::Running | Status::Idle)
    }

    /// The error that ended the run, if the run failed.
    pub fn error(&self) -> Option<&Error> {
        match self {
            Status::Finished(Some(err)) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Created => write!(f, "created"),
            Status::Initializing => write!(f, "initializing"),
            Status::Ready => write!(f, "ready"),
            Status::Running => write!(f, "running"),
            Status::Idle => write!(f, "idle"),
            Status::Finished(None) => write!(f, "finished"),
            Status::Finished(Some(err)) => write!(f, "finished ({err})"),
        }
    }
}
