use axum::{extract::Path, response::IntoResponse, Json};
use serde_json::json;

use crate::error::ApiError;

/// DELETE /api/gift-rules/:id - remove a rule, or deactivate it when grant
/// history references it
pub async fn rule_delete(Path(id): Path<i64>) -> Result<impl IntoResponse, ApiError> {
    let outcome = super::service().await?.delete(id).await?;
    Ok(Json(json!({ "success": true, "outcome": outcome })))
}
