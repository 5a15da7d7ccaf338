use crate::clust::Clust;
use crate::conf::CtrlConf;
use crate::figures::RuntimeFigures;
use crate::space::Space;
use crate::status::Status;

/// Read-only snapshot of the controller state, handed to an
/// [`Algorithm`](crate::Algorithm) on every call.
///
/// Implementations need parts of the controller state (configuration, space,
/// status, current centroids) while iterating. Passing a snapshot by value
/// instead of a back-reference avoids an ownership cycle between the
/// controller and its implementation, and makes implementations trivially
/// clonable. The snapshot is taken under the model read lock and is consistent
/// with some completed iteration.
#[derive(Clone, Debug)]
pub struct ModelView<S: Space> {
    pub conf: CtrlConf,
    pub space: S,
    pub status: Status,
    pub figures: RuntimeFigures,
    /// Deep copy of the current centroids, absent before initialization.
    pub centroids: Option<Clust<S::Point>>,
}

impl<S: Space> ModelView<S> {
    pub fn new(
        conf: CtrlConf,
        space: S,
        status: Status,
        figures: RuntimeFigures,
        centroids: Option<Clust<S::Point>>,
    ) -> Self {
        ModelView {
            conf,
            space,
            status,
            figures,
            centroids,
        }
    }

    /// True while a worker is driving this model.
    pub fn running(&self) -> bool {
        self.status.alive()
    }
}
