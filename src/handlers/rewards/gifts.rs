use axum::{extract::Path, response::IntoResponse, Json};
use serde_json::json;

use crate::database::models::Beneficiary;
use crate::error::ApiError;

/// GET /api/rewards/guest-list/:id/gifts - non-voided gifts for a guest
/// list, newest first
pub async fn guest_list_gifts(Path(id): Path<i64>) -> Result<impl IntoResponse, ApiError> {
    let gifts = super::evaluator()
        .await?
        .granted_gifts(Beneficiary::AnniversaryList { guest_list_id: id })
        .await?;
    Ok(Json(json!({ "success": true, "gifts": gifts })))
}
