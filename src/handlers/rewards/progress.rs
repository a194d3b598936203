use axum::{extract::Path, response::IntoResponse, Json};
use serde_json::json;

use crate::error::ApiError;

/// GET /api/rewards/promoter/:promoter_id/events/:event_id
///
/// Invocation B: evaluates the promoter beneficiary (granting any newly
/// crossed tiers) and returns every matching rule annotated with progress
/// for the staff/promoter view.
pub async fn promoter_progress(
    Path((promoter_id, event_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = super::evaluator()
        .await?
        .evaluate_promoter(promoter_id, event_id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "checkins_count": outcome.count,
        "gifts": outcome.granted,
        "rules": outcome.progress,
    })))
}
