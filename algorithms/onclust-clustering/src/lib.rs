//! Clustering strategies and distance spaces for the
//! [`onclust`](https://docs.rs/onclust) framework.
//!
//! This crate provides the concrete pieces a controller needs:
//!
//! | Name | Purpose | Category |
//! | :--- | :--- | :--- |
//! | [`Euclid`] | L2 distance over dense vectors | space |
//! | [`Cosine`] | angular distance over dense vectors | space |
//! | [`Series`] | windowed dynamic time warping over variable-length series | space |
//! | [`KMeans`] | partition refinement on a fixed number of centroids | strategy |
//! | [`Mcmc`] | variable-K clustering by Metropolis proposals | strategy |
//! | [`Streaming`] | single-pass clustering over a bounded buffer | strategy |
//!
//! Every strategy is configured through a `Params` builder checked into a
//! `ValidParams` set (see [`onclust::ParamGuard`]), then driven by an
//! [`onclust::Controller`].

pub mod cosine;
pub mod euclid;
pub mod k_means;
pub mod mcmc;
pub mod series;
pub mod streaming;

pub use cosine::Cosine;
pub use euclid::Euclid;
pub use k_means::{KMeans, KMeansInit, KMeansParams, KMeansParamsError, KMeansValidParams};
pub use mcmc::{Mcmc, McmcParams, McmcParamsError, McmcValidParams};
pub use series::Series;
pub use streaming::{Streaming, StreamingParams, StreamingParamsError, StreamingValidParams};
