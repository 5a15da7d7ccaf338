/// A set of parameters whose values have not been checked for validity.
///
/// Algorithm hyperparameter builders implement this trait: the unchecked
/// builder accumulates settings, and a checked parameter set can only be
/// obtained through [`ParamGuard::check`]. The validation done by `check_ref`
/// and `check` must be identical.
pub trait ParamGuard {
    /// The checked parameter set.
    type Checked;
    /// Error raised when a parameter value is invalid.
    type Error: std::error::Error;

    /// Checks the parameter set and borrows it if every value is valid.
    fn check_ref(&self) -> Result<&Self::Checked, Self::Error>;

    /// Checks the parameter set and returns it if every value is valid.
    fn check(self) -> Result<Self::Checked, Self::Error>;

    /// Calls `check()` and unwraps the result.
    fn check_unwrap(self) -> Self::Checked
    where
        Self: Sized,
    {
        self.check().unwrap()
    }
}
