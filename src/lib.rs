//! `onclust` is a framework for **online, controllable clustering**: it
//! accepts a potentially unbounded stream of observations, maintains a small
//! set of cluster centroids over that stream, and lets callers query the
//! current model at any time while the algorithm iterates in the background.
//!
//! The framework splits the work in two:
//!
//! - a [`Controller`] owns one worker thread and exposes synchronous and
//!   asynchronous control over it — `init`, `play`, `pause`, `wait`, `stop`,
//!   `batch`, `push`, `reconfigure`, `predict`, `centroids` — together with
//!   composable termination predicates ([`Finishing`]), an iteration
//!   frequency cap, wall-clock timeouts and live [`figures`];
//! - an [`Algorithm`] plugs the actual clustering strategy in through a small
//!   contract (`init`, `iterate`, `push`, `copy`) and never deals with
//!   threads or locks itself.
//!
//! Elements are opaque: only a [`Space`] — distance, weighted combination,
//! duplication — may interpret them, so the same controller drives euclidean
//! vectors, cosine-compared embeddings or dynamic-time-warped series alike.
//! Concrete spaces and strategies (k-means partition refinement, a variable-K
//! Markov-chain proposer, a single-pass streaming strategy) live in the
//! `onclust-clustering` crate.
//!
//! ## Example
//!
//! ```ignore
//! use onclust::prelude::*;
//!
//! let conf = CtrlConf { iter: 20, ..CtrlConf::default() };
//! let controller = Controller::new(conf, algorithm, space)?;
//! for point in observations {
//!     controller.push(point)?;
//! }
//! controller.batch(None, std::time::Duration::ZERO)?;
//! let (centroid, label, dist) = controller.predict(&observation)?;
//! ```

pub mod algorithm;
pub mod clust;
pub mod conf;
pub mod controller;
pub mod error;
pub mod figures;
pub mod finishing;
pub mod model;
pub mod param_guard;
pub mod prelude;
pub mod space;
pub mod status;

pub use algorithm::{Algorithm, Iteration};
pub use clust::Clust;
pub use conf::{CtrlConf, StatusNotifier};
pub use controller::Controller;
pub use error::{Error, Result};
pub use figures::RuntimeFigures;
pub use finishing::{Finishing, FinishingView, IterFinishing, TimeoutFinishing};
pub use model::ModelView;
pub use param_guard::ParamGuard;
pub use space::Space;
pub use status::Status;
