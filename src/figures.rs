//! Named numeric statistics published by the controller on each iteration.

use std::collections::HashMap;

/// Mapping from well-known keys to values.
///
/// The controller merges its own figures into whatever the implementation
/// returned from `iterate`, then publishes the result under the model lock.
/// Readers always receive a value copy.
pub type RuntimeFigures = HashMap<&'static str, f64>;

/// Total successful iterations over the controller lifetime.
pub const ITERATIONS: &str = "iterations";
/// Successful iterations of the current (or last) run.
pub const LAST_ITERATIONS: &str = "lastIterations";
/// Number of elements pushed so far.
pub const PUSHED_DATA: &str = "pushedData";
/// Accumulated iteration time in nanoseconds.
pub const DURATION: &str = "duration";
/// Elapsed time of the current (or last) run in nanoseconds.
pub const LAST_DURATION: &str = "lastDuration";
/// Unix timestamp (seconds) of the last pushed element.
pub const LAST_DATA_TIME: &str = "lastDataTime";
