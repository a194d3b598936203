mod create;
mod delete;
mod get;
mod list;
mod update;

pub use create::rule_create;
pub use delete::rule_delete;
pub use get::rule_get;
pub use list::rule_list;
pub use update::rule_update;

use sqlx::PgPool;

use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::services::rule_service::RuleService;

pub(super) async fn service() -> Result<RuleService, ApiError> {
    let pool: PgPool = DatabaseManager::pool().await?;
    Ok(RuleService::new(pool))
}
