use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::error::ApiError;
use crate::services::rule_service::NewRule;

/// POST /api/gift-rules - create a reward rule
pub async fn rule_create(Json(body): Json<NewRule>) -> Result<impl IntoResponse, ApiError> {
    let rule = super::service().await?.create(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "rule": rule })),
    ))
}
