use onclust::ParamGuard;
use rand::Rng;

use super::errors::McmcParamsError;

/// The checked set of hyperparameters for the MCMC strategy.
#[derive(Clone, Debug)]
pub struct McmcValidParams<R: Rng> {
    /// Number of centroids the initialization seeds.
    init_k: usize,
    /// Upper bound on the number of centroids a proposal may carry.
    max_k: usize,
    /// Temperature of the Metropolis test: larger values accept worse
    /// proposals more readily.
    amp: f64,
    /// Geometric prior per extra centroid, penalizing growth when above 1.
    b: f64,
    /// Exponent of the loss.
    norm: f64,
    /// Partition-refinement passes applied to each proposal.
    proposal_iter: usize,
    /// The random number generator driving proposals and acceptance.
    rng: R,
}

/// A helper struct used to construct a set of valid hyperparameters for the
/// MCMC strategy, using the builder pattern.
#[derive(Clone, Debug)]
pub struct McmcParams<R: Rng>(McmcValidParams<R>);

impl<R: Rng> McmcParams<R> {
    /// Configure the strategy to start from `init_k` centroids, growing up to
    /// `max_k`.
    ///
    /// Defaults are provided if optional parameters are not specified:
    /// * `amp = 1.0`
    /// * `b = 1.0`
    /// * `norm = 2.0`
    /// * `proposal_iter = 1`
    pub fn new(init_k: usize, max_k: usize, rng: R) -> Self {
        McmcParams(McmcValidParams {
            init_k,
            max_k,
            amp: 1.0,
            b: 1.0,
            norm: 2.0,
            proposal_iter: 1,
            rng,
        })
    }

    /// Change the acceptance temperature.
    pub fn amp(mut self, amp: f64) -> Self {
        self.0.amp = amp;
        self
    }

    /// Change the per-centroid prior.
    pub fn b(mut self, b: f64) -> Self {
        self.0.b = b;
        self
    }

    /// Change the loss exponent.
    pub fn norm(mut self, norm: f64) -> Self {
        self.0.norm = norm;
        self
    }

    /// Change the number of refinement passes per proposal.
    pub fn proposal_iter(mut self, proposal_iter: usize) -> Self {
        self.0.proposal_iter = proposal_iter;
        self
    }
}

impl<R: Rng> ParamGuard for McmcParams<R> {
    type Checked = McmcValidParams<R>;
    type Error = McmcParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.init_k == 0 {
            Err(McmcParamsError::InitKZero)
        } else if self.0.max_k < self.0.init_k {
            Err(McmcParamsError::MaxKBelowInitK)
        } else if !self.0.amp.is_finite() || self.0.amp <= 0.0 {
            Err(McmcParamsError::Amp)
        } else if !self.0.b.is_finite() || self.0.b <= 0.0 {
            Err(McmcParamsError::B)
        } else if self.0.proposal_iter == 0 {
            Err(McmcParamsError::ProposalIterZero)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<R: Rng> McmcValidParams<R> {
    pub fn init_k(&self) -> usize {
        self.init_k
    }

    pub fn max_k(&self) -> usize {
        self.max_k
    }

    pub fn amp(&self) -> f64 {
        self.amp
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn norm(&self) -> f64 {
        self.norm
    }

    pub fn proposal_iter(&self) -> usize {
        self.proposal_iter
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }
}
