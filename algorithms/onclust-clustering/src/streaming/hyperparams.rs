use onclust::ParamGuard;
use rand::Rng;

use super::errors::StreamingParamsError;

/// The checked set of hyperparameters for the streaming strategy.
#[derive(Clone, Debug)]
pub struct StreamingValidParams<R: Rng> {
    /// Capacity of the ingest buffer; pushes beyond it are rejected.
    buffer_size: usize,
    /// Mean of the relative-distance threshold above which an element seeds
    /// a new cluster instead of joining the nearest one.
    mu: f64,
    /// Spread of that threshold.
    sigma: f64,
    /// Relative distance beyond which an element is treated as an outlier.
    out_ratio: f64,
    /// Minimum number of clusters before outliers may seed their own.
    out_after: usize,
    /// The random number generator drawing the thresholds.
    rng: R,
}

/// A helper struct used to construct a set of valid hyperparameters for the
/// streaming strategy, using the builder pattern.
#[derive(Clone, Debug)]
pub struct StreamingParams<R: Rng>(StreamingValidParams<R>);

impl<R: Rng> StreamingParams<R> {
    /// Configure the strategy.
    ///
    /// Defaults are provided if optional parameters are not specified:
    /// * `buffer_size = 100`
    /// * `mu = 0.5`
    /// * `sigma = 0.1`
    /// * `out_ratio = 2.0`
    /// * `out_after = 5`
    pub fn new(rng: R) -> Self {
        StreamingParams(StreamingValidParams {
            buffer_size: 100,
            mu: 0.5,
            sigma: 0.1,
            out_ratio: 2.0,
            out_after: 5,
            rng,
        })
    }

    /// Change the ingest buffer capacity.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.0.buffer_size = buffer_size;
        self
    }

    /// Change the mean of the growth threshold.
    pub fn mu(mut self, mu: f64) -> Self {
        self.0.mu = mu;
        self
    }

    /// Change the spread of the growth threshold.
    pub fn sigma(mut self, sigma: f64) -> Self {
        self.0.sigma = sigma;
        self
    }

    /// Change the outlier ratio.
    pub fn out_ratio(mut self, out_ratio: f64) -> Self {
        self.0.out_ratio = out_ratio;
        self
    }

    /// Change the minimum cluster count before outliers split off.
    pub fn out_after(mut self, out_after: usize) -> Self {
        self.0.out_after = out_after;
        self
    }
}

impl<R: Rng> ParamGuard for StreamingParams<R> {
    type Checked = StreamingValidParams<R>;
    type Error = StreamingParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.buffer_size == 0 {
            Err(StreamingParamsError::BufferSizeZero)
        } else if !self.0.sigma.is_finite() || self.0.sigma < 0.0 {
            Err(StreamingParamsError::Sigma)
        } else if !self.0.out_ratio.is_finite() || self.0.out_ratio < 0.0 {
            Err(StreamingParamsError::OutRatio)
        } else if self.0.out_after == 0 {
            Err(StreamingParamsError::OutAfterZero)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<R: Rng> StreamingValidParams<R> {
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn out_ratio(&self) -> f64 {
        self.out_ratio
    }

    pub fn out_after(&self) -> usize {
        self.out_after
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }
}
