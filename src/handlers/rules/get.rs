use axum::{extract::Path, response::IntoResponse, Json};
use serde_json::json;

use crate::error::ApiError;

/// GET /api/gift-rules/:id - fetch one rule
pub async fn rule_get(Path(id): Path<i64>) -> Result<impl IntoResponse, ApiError> {
    let rule = super::service().await?.get(id).await?;
    Ok(Json(json!({ "success": true, "rule": rule })))
}
