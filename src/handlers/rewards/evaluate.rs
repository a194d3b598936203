use axum::{extract::Path, response::IntoResponse, Json};
use serde_json::json;

use crate::error::ApiError;

/// POST /api/rewards/guest-list/:id/evaluate
///
/// Invocation A: called after a check-in is recorded (staff or geolocation
/// self-check-in flow). Idempotent; re-posting with an unchanged count
/// grants nothing new.
pub async fn guest_list_evaluate(Path(id): Path<i64>) -> Result<impl IntoResponse, ApiError> {
    let outcome = super::evaluator().await?.evaluate_guest_list(id).await?;
    Ok(Json(json!({
        "success": true,
        "checkins_count": outcome.count,
        "gifts": outcome.granted,
    })))
}
