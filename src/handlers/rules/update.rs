use axum::{extract::Path, response::IntoResponse, Json};
use serde_json::json;

use crate::error::ApiError;
use crate::services::rule_service::RuleUpdate;

/// PUT /api/gift-rules/:id - partial update of a rule. Existing grants are
/// never revisited.
pub async fn rule_update(
    Path(id): Path<i64>,
    Json(body): Json<RuleUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let rule = super::service().await?.update(id, body).await?;
    Ok(Json(json!({ "success": true, "rule": rule })))
}
