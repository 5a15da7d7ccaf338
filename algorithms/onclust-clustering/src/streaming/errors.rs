use thiserror::Error;

/// An error when checking streaming hyperparameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamingParamsError {
    #[error("`buffer_size` must be greater than 0")]
    BufferSizeZero,
    #[error("`sigma` must be a finite value >= 0")]
    Sigma,
    #[error("`out_ratio` must be a finite value >= 0")]
    OutRatio,
    #[error("`out_after` must be greater than 0")]
    OutAfterZero,
}
