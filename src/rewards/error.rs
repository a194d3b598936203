use thiserror::Error;

use crate::database::models::UnknownValue;

/// Failure taxonomy of the reward engine. The evaluator never retries or
/// suppresses; every failure surfaces to the caller as one of these.
#[derive(Debug, Error)]
pub enum RewardError {
    /// Beneficiary, rule, or grant id does not resolve to a row.
    #[error("not found: {0}")]
    NotFound(String),

    /// Beneficiary data is internally inconsistent (e.g. a guest list with
    /// no establishment linkage).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Underlying read/write to the datastore failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for RewardError {
    fn from(err: sqlx::Error) -> Self {
        RewardError::Storage(err.to_string())
    }
}

impl From<UnknownValue> for RewardError {
    fn from(err: UnknownValue) -> Self {
        RewardError::Storage(err.to_string())
    }
}
