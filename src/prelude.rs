//! Flat import surface for the most common types.
//!
//! ```
//! use onclust::prelude::*;
//! ```

pub use crate::algorithm::{Algorithm, Iteration};
pub use crate::clust::Clust;
pub use crate::conf::{CtrlConf, StatusNotifier};
pub use crate::controller::Controller;
pub use crate::error::{Error, Result};
pub use crate::figures::RuntimeFigures;
pub use crate::finishing::{
    AndFinishing, Finishing, FinishingView, IterFinishing, OrFinishing, TimeoutFinishing,
};
pub use crate::model::ModelView;
pub use crate::param_guard::ParamGuard;
pub use crate::space::Space;
pub use crate::status::Status;
