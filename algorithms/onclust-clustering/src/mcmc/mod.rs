//! Variable-K clustering by a Markov-chain proposer.
//!
//! Each tick proposes a clustering with one centroid more, one less or as
//! many as the current one, refines the proposal with a few partition
//! passes, and accepts it by a Metropolis test on the empirical loss. The
//! number of clusters therefore evolves with the data instead of being fixed
//! up front.

mod algorithm;
mod errors;
mod hyperparams;

pub use algorithm::Mcmc;
pub use errors::McmcParamsError;
pub use hyperparams::{McmcParams, McmcValidParams};

/// Number of accepted proposals so far.
pub const ACCEPTATIONS: &str = "acceptations";
/// Empirical loss of the published centroids.
pub const LOSS: &str = "loss";
/// Number of centroids the last proposal carried.
pub const PROPOSED_K: &str = "proposedK";
