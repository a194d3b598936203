pub mod beneficiary;
pub mod grant;
pub mod rule;

pub use beneficiary::Beneficiary;
pub use grant::{GrantStatus, RewardGrant};
pub use rule::{BeneficiaryKind, RewardRule, RuleStatus};

use thiserror::Error;

/// A stored text value that does not map to any known enum variant.
/// Surfacing this instead of panicking keeps bad rows diagnosable.
#[derive(Debug, Error)]
#[error("unknown {field} value: {value}")]
pub struct UnknownValue {
    pub field: &'static str,
    pub value: String,
}
