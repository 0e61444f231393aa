use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum AdaptError
{
    /// A strategy or interpolator was configured with inconsistent values.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The target, grid and strategy disagree on the number of inputs or outputs.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

pub type AdaptResult<T> = Result<T, AdaptError>;

#[test]
fn check_error_messages()
{
    let error = AdaptError::Config("min_level > max_level".to_owned());
    assert_eq!(error.to_string(), "invalid configuration: min_level > max_level");
    let error = AdaptError::DimensionMismatch { expected: 2, found: 3 };
    assert_eq!(error.to_string(), "dimension mismatch: expected 2, found 3");
}
