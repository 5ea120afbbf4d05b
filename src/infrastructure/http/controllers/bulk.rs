use axum::{extract::State, Json};

use crate::domain::entities::{BulkOperation, BulkResult};
use crate::infrastructure::http::middleware::{ApiResult, AppState};

// POST /api/v1/bulk/assignments - Create assignments for many users at once
pub async fn create_assignments(
    State(state): State<AppState>,
    Json(operations): Json<Vec<BulkOperation>>,
) -> ApiResult<Json<BulkResult>> {
    let result = state.bulk_assignment_service.create(&operations).await?;
    Ok(Json(result))
}

// POST /api/v1/bulk/assignments/cancel - Cancel the assignments of many users
pub async fn cancel_assignments(
    State(state): State<AppState>,
    Json(operations): Json<Vec<BulkOperation>>,
) -> ApiResult<Json<BulkResult>> {
    let result = state.bulk_assignment_service.cancel(&operations).await?;
    Ok(Json(result))
}
