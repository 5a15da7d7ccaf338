use crate::clust::Clust;
use crate::error::Result;
use crate::figures::RuntimeFigures;
use crate::model::ModelView;
use crate::space::Space;

/// Outcome of one successful iteration tick.
pub struct Iteration<P> {
    /// The next generation of centroids.
    pub centroids: Clust<P>,
    /// Implementation-specific figures; the controller merges its own keys in
    /// before publishing.
    pub figures: RuntimeFigures,
}

impl<P> Iteration<P> {
    pub fn new(centroids: Clust<P>) -> Self {
        Iteration {
            centroids,
            figures: RuntimeFigures::new(),
        }
    }

    pub fn with_figures(centroids: Clust<P>, figures: RuntimeFigures) -> Self {
        Iteration { centroids, figures }
    }
}

/// A pluggable clustering strategy driven by a
/// [`Controller`](crate::Controller).
///
/// The controller calls `iterate` sequentially from a single worker task at a
/// cadence it chooses; `push` may be called concurrently from any number of
/// producer tasks, so implementations guard their ingest buffer internally.
/// Implementations never spawn tasks of their own and never call back into
/// the controller: every piece of controller state they need arrives in the
/// [`ModelView`].
pub trait Algorithm<S: Space>: Send + Sync + 'static {
    /// Produce the starting centroids from buffered data or a configured
    /// seed. Fails with [`Error::NotEnoughData`](crate::Error::NotEnoughData)
    /// when the buffer cannot seed the requested number of centroids.
    fn init(&self, view: &ModelView<S>) -> Result<Clust<S::Point>>;

    /// Perform one tick of work. `Ok(None)` means nothing was done (for
    /// example a streaming strategy waiting on an empty buffer) and does not
    /// count as an iteration.
    fn iterate(&self, view: &ModelView<S>) -> Result<Option<Iteration<S::Point>>>;

    /// Accept a new observation. `running` tells whether a worker is alive.
    /// Bounded-buffer strategies fail with
    /// [`Error::BufferFull`](crate::Error::BufferFull).
    fn push(&self, point: S::Point, running: bool) -> Result<()>;

    /// Deep clone of this strategy, used by `reconfigure` and `copy`.
    fn copy(&self, view: &ModelView<S>) -> Result<Self>
    where
        Self: Sized;
}
