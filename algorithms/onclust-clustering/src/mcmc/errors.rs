use thiserror::Error;

/// An error when checking MCMC hyperparameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum McmcParamsError {
    #[error("`init_k` must be greater than 0")]
    InitKZero,
    #[error("`max_k` must be greater or equal than `init_k`")]
    MaxKBelowInitK,
    #[error("`amp` must be a finite value greater than 0")]
    Amp,
    #[error("`b` must be a finite value greater than 0")]
    B,
    #[error("`proposal_iter` must be greater than 0")]
    ProposalIterZero,
}
