use axum::{extract::Query, response::IntoResponse, Json};
use serde_json::json;

use crate::error::ApiError;
use crate::services::rule_service::RuleFilter;

/// GET /api/gift-rules - list rules, optionally filtered by establishment
/// and/or event
pub async fn rule_list(Query(filter): Query<RuleFilter>) -> Result<impl IntoResponse, ApiError> {
    let rules = super::service().await?.list(filter).await?;
    Ok(Json(json!({ "success": true, "rules": rules })))
}
