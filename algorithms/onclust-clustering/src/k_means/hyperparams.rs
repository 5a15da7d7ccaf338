use onclust::{ParamGuard, Space};
use rand::Rng;

use super::errors::KMeansParamsError;
use super::init::KMeansInit;

/// The checked set of hyperparameters for the k-means strategy.
#[derive(Clone, Debug)]
pub struct KMeansValidParams<S: Space, R: Rng> {
    /// The number of clusters to refine.
    k: usize,
    /// Whether the assignment step runs over parallel chunks.
    parallel: bool,
    /// The initialization strategy used to seed the centroids.
    init: KMeansInit<S::Point>,
    /// The random number generator used by the initialization.
    rng: R,
}

/// A helper struct used to construct a set of valid hyperparameters for the
/// k-means strategy, using the builder pattern.
#[derive(Clone, Debug)]
pub struct KMeansParams<S: Space, R: Rng>(KMeansValidParams<S, R>);

impl<S: Space, R: Rng> KMeansParams<S, R> {
    /// Configure the strategy to look for `k` clusters.
    ///
    /// Defaults are provided if optional parameters are not specified:
    /// * `parallel = false`
    /// * `init = KMeansInit::Random`
    pub fn new(k: usize, rng: R) -> Self {
        KMeansParams(KMeansValidParams {
            k,
            parallel: false,
            init: KMeansInit::Random,
            rng,
        })
    }

    /// Change whether assignment runs over parallel chunks.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.0.parallel = parallel;
        self
    }

    /// Change the initialization strategy.
    pub fn init_method(mut self, init: KMeansInit<S::Point>) -> Self {
        self.0.init = init;
        self
    }
}

impl<S: Space, R: Rng> ParamGuard for KMeansParams<S, R> {
    type Checked = KMeansValidParams<S, R>;
    type Error = KMeansParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.k == 0 {
            Err(KMeansParamsError::KZero)
        } else if let KMeansInit::Given(seed) = &self.0.init {
            if seed.len() != self.0.k {
                Err(KMeansParamsError::InitMismatch {
                    expected: self.0.k,
                    got: seed.len(),
                })
            } else {
                Ok(&self.0)
            }
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<S: Space, R: Rng> KMeansValidParams<S, R> {
    /// The number of clusters the strategy refines.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Whether assignment runs over parallel chunks.
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// The initialization strategy.
    pub fn init_method(&self) -> &KMeansInit<S::Point> {
        &self.init
    }

    /// The random number generator.
    pub fn rng(&self) -> &R {
        &self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::euclid::Euclid;
    use crate::k_means::KMeans;
    use ndarray::array;
    use onclust::Clust;

    #[test]
    fn k_cannot_be_zero() {
        let result = KMeans::<Euclid>::params(0).check();
        assert!(matches!(result, Err(KMeansParamsError::KZero)));
    }

    #[test]
    fn given_seed_must_match_k() {
        let seed = Clust::from(vec![array![0.0], array![1.0]]);
        let result = KMeans::<Euclid>::params(3)
            .init_method(KMeansInit::Given(seed))
            .check();
        assert!(matches!(
            result,
            Err(KMeansParamsError::InitMismatch {
                expected: 3,
                got: 2
            })
        ));
    }

    #[test]
    fn valid_params_pass() {
        let params = KMeans::<Euclid>::params(2).parallel(true).check().unwrap();
        assert_eq!(params.k(), 2);
        assert!(params.parallel());
    }
}
