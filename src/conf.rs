use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::finishing::Finishing;
use crate::status::Status;

/// Callback invoked synchronously on every status transition.
///
/// The notifier runs on whichever task performed the transition (usually the
/// worker) and must not call back into the controller.
pub type StatusNotifier = Arc<dyn Fn(&Status) + Send + Sync>;

/// Controller configuration.
///
/// All numeric options treat zero as "disabled". Verification happens when a
/// controller is built or reconfigured and fails with
/// [`Error::InvalidConfig`].
#[derive(Clone, Default)]
pub struct CtrlConf {
    /// Maximum iterations of the first run; `0` is unlimited.
    pub iter: usize,
    /// Maximum iterations of each run after the first successful one.
    pub iter_per_data: usize,
    /// Upper bound on iterations per second; `0` is uncapped.
    pub iter_freq: f64,
    /// Hard wall-clock cap on a run; zero means none.
    pub timeout: Duration,
    /// Number of buffered pushes that auto-plays a controller which is not
    /// alive; `0` disables auto-play.
    pub data_per_iter: usize,
    /// Termination predicate composed (by conjunction) with any predicate the
    /// caller passes to `play`, `wait` or `batch`.
    pub finishing: Option<Arc<dyn Finishing>>,
    /// Observer of every status transition.
    pub status_notifier: Option<StatusNotifier>,
}

impl CtrlConf {
    pub(crate) fn verify(&self) -> Result<()> {
        if !self.iter_freq.is_finite() || self.iter_freq < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "iter_freq must be a finite value >= 0, got {}",
                self.iter_freq
            )));
        }
        Ok(())
    }

    /// Minimum duration of a tick implied by `iter_freq`, if capped.
    pub(crate) fn period(&self) -> Option<Duration> {
        if self.iter_freq > 0.0 {
            Some(Duration::from_secs_f64(1.0 / self.iter_freq))
        } else {
            None
        }
    }
}

impl fmt::Debug for CtrlConf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CtrlConf")
            .field("iter", &self.iter)
            .field("iter_per_data", &self.iter_per_data)
            .field("iter_freq", &self.iter_freq)
            .field("timeout", &self.timeout)
            .field("data_per_iter", &self.data_per_iter)
            .field("finishing", &self.finishing.is_some())
            .field("status_notifier", &self.status_notifier.is_some())
            .finish()
    }
}
