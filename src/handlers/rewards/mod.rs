mod deliver;
mod evaluate;
mod gifts;
mod progress;

pub use deliver::gift_deliver;
pub use evaluate::guest_list_evaluate;
pub use gifts::guest_list_gifts;
pub use progress::promoter_progress;

use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::rewards::{PgRewardStore, RewardEvaluator};

pub(super) async fn evaluator() -> Result<RewardEvaluator<PgRewardStore>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let venue_tz = crate::config::config().venue_tz();
    Ok(RewardEvaluator::new(PgRewardStore::new(pool, venue_tz)))
}
