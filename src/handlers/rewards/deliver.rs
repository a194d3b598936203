use axum::{extract::Path, response::IntoResponse, Json};
use serde_json::json;

use crate::error::ApiError;

/// PUT /api/rewards/gifts/:grant_id/deliver - staff confirms the physical
/// handover; only GRANTED gifts can transition
pub async fn gift_deliver(Path(grant_id): Path<i64>) -> Result<impl IntoResponse, ApiError> {
    let gift = super::evaluator().await?.deliver(grant_id).await?;
    Ok(Json(json!({ "success": true, "gift": gift })))
}
