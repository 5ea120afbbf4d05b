use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::domain::entities::LtiInstance;
use crate::infrastructure::http::middleware::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateInstanceRequest {
    pub label: String,
    pub link: String,
    pub key: String,
    pub secret: String,
    #[serde(default)]
    pub position: i64,
}

// GET /api/v1/lti-instances - Current instance pool, in selection order
pub async fn list_instances(State(state): State<AppState>) -> ApiResult<Json<Vec<LtiInstance>>> {
    let pool = state.instance_pool.snapshot().await?;
    Ok(Json(pool.to_vec()))
}

// POST /api/v1/lti-instances - Add an instance to the pool
pub async fn create_instance(
    State(state): State<AppState>,
    Json(req): Json<CreateInstanceRequest>,
) -> ApiResult<(StatusCode, Json<LtiInstance>)> {
    if url::Url::parse(&req.link).is_err() {
        return Err(ApiError::BadRequest(format!("Invalid instance link '{}'", req.link)));
    }
    if req.key.is_empty() || req.secret.is_empty() {
        return Err(ApiError::BadRequest("Key and secret are required".to_string()));
    }

    let instance = LtiInstance::new(req.label, req.link, req.key, req.secret, req.position);
    state.instance_pool.add_instance(&instance).await?;

    Ok((StatusCode::CREATED, Json(instance)))
}

// DELETE /api/v1/lti-instances/:id - Remove an instance from the pool
pub async fn delete_instance(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.instance_pool.remove_instance(&instance_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
