//! Single-pass clustering over a bounded ingest buffer.
//!
//! Elements stream through a bounded channel; each tick folds one buffered
//! element into the model, parking when the buffer is empty. Clusters grow
//! when an element lands unusually far from every centroid, otherwise the
//! nearest centroid absorbs it.

mod algorithm;
mod errors;
mod hyperparams;

pub use algorithm::Streaming;
pub use errors::StreamingParamsError;
pub use hyperparams::{StreamingParams, StreamingValidParams};

/// Largest distance at which an element was absorbed by a cluster so far.
pub const MAX_DISTANCE: &str = "maxDistance";
