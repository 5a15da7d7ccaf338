use thiserror::Error;

/// An error when checking k-means hyperparameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KMeansParamsError {
    #[error("`k` must be greater than 0")]
    KZero,
    #[error("the given initial centroids do not match `k`: expected {expected}, got {got}")]
    InitMismatch { expected: usize, got: usize },
}
