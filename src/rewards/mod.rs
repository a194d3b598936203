//! Check-in-driven reward eligibility engine.
//!
//! The evaluator is the only place that decides whether a reward unlocks;
//! the HTTP layer and the check-in flow just invoke it. Grants are written
//! one tier at a time with no wrapping transaction: a failure mid-list
//! leaves earlier grants in place (at-least-once batch, by intent), and
//! duplicate suppression is delegated to the store's uniqueness constraint
//! rather than trusted to the read-then-insert window.

pub mod criteria;
pub mod error;
pub mod evaluator;
pub mod pg_store;
pub mod store;
pub mod time;

pub use criteria::RuleCriteria;
pub use error::RewardError;
pub use evaluator::{Evaluation, GrantedRule, PromoterEvaluation, RewardEvaluator, RuleProgress};
pub use pg_store::PgRewardStore;
pub use store::{
    DeliverOutcome, GrantedGift, GuestListContext, InsertOutcome, PromoterEventContext, RewardStore,
};
