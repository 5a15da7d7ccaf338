//! Composable termination predicates evaluated against live runtime figures.

use std::sync::Arc;
use std::time::Duration;

use crate::figures::{RuntimeFigures, LAST_ITERATIONS};
use crate::status::Status;

/// The slice of controller state a predicate may look at.
pub struct FinishingView<'a> {
    pub status: &'a Status,
    pub figures: &'a RuntimeFigures,
    /// Elapsed time of the current run.
    pub elapsed: Duration,
}

/// A boolean termination test.
///
/// The controller evaluates the composition of the configured predicate and
/// the caller-supplied one on every tick; the worker exits as soon as it
/// holds. Predicates are shared across threads, hence the `Arc` in
/// [`Finishing`] compositions.
pub trait Finishing: Send + Sync {
    fn is_finished(&self, view: &FinishingView<'_>) -> bool;
}

/// Finished once the current run performed at least `iter` iterations.
#[derive(Clone, Copy, Debug)]
pub struct IterFinishing {
    pub iter: u64,
}

impl IterFinishing {
    pub fn new(iter: u64) -> Self {
        IterFinishing { iter }
    }
}

impl Finishing for IterFinishing {
    fn is_finished(&self, view: &FinishingView<'_>) -> bool {
        view.figures.get(LAST_ITERATIONS).copied().unwrap_or(0.0) >= self.iter as f64
    }
}

/// Finished once the current run lasted at least `duration`.
#[derive(Clone, Copy, Debug)]
pub struct TimeoutFinishing {
    pub duration: Duration,
}

impl TimeoutFinishing {
    pub fn new(duration: Duration) -> Self {
        TimeoutFinishing { duration }
    }
}

impl Finishing for TimeoutFinishing {
    fn is_finished(&self, view: &FinishingView<'_>) -> bool {
        view.elapsed >= self.duration
    }
}

/// Conjunction of two optional predicates.
///
/// An absent side never finishes on its own, but it does not veto the other:
/// `and(None, p)` behaves exactly like `p`, and `and(None, None)` never
/// finishes. This is what lets a caller-supplied predicate terminate a run
/// whose configuration has none.
pub struct AndFinishing {
    lhs: Option<Arc<dyn Finishing>>,
    rhs: Option<Arc<dyn Finishing>>,
}

impl AndFinishing {
    pub fn new(lhs: Option<Arc<dyn Finishing>>, rhs: Option<Arc<dyn Finishing>>) -> Self {
        AndFinishing { lhs, rhs }
    }
}

impl Finishing for AndFinishing {
    fn is_finished(&self, view: &FinishingView<'_>) -> bool {
        match (&self.lhs, &self.rhs) {
            (None, None) => false,
            (Some(lhs), None) => lhs.is_finished(view),
            (None, Some(rhs)) => rhs.is_finished(view),
            (Some(lhs), Some(rhs)) => lhs.is_finished(view) && rhs.is_finished(view),
        }
    }
}

/// Disjunction of two optional predicates; an absent side is identity-false.
pub struct OrFinishing {
    lhs: Option<Arc<dyn Finishing>>,
    rhs: Option<Arc<dyn Finishing>>,
}

impl OrFinishing {
    pub fn new(lhs: Option<Arc<dyn Finishing>>, rhs: Option<Arc<dyn Finishing>>) -> Self {
        OrFinishing { lhs, rhs }
    }
}

impl Finishing for OrFinishing {
    fn is_finished(&self, view: &FinishingView<'_>) -> bool {
        match (&self.lhs, &self.rhs) {
            (None, None) => false,
            (Some(lhs), None) => lhs.is_finished(view),
            (None, Some(rhs)) => rhs.is_finished(view),
            (Some(lhs), Some(rhs)) => lhs.is_finished(view) || rhs.is_finished(view),
        }
    }
}
