use axum::{
    extract::{Path, State},
    Json,
};

use crate::infrastructure::http::middleware::{ApiResult, AppState};
use crate::lti::LtiRequest;

// GET /api/v1/assignments/:id/lti-link - Build the LTI launch of an assignment
pub async fn get_lti_link(
    State(state): State<AppState>,
    Path(assignment_id): Path<String>,
) -> ApiResult<Json<LtiRequest>> {
    let request = state.launch_service.build(&assignment_id).await?;
    Ok(Json(request))
}
