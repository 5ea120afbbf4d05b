use crate::config::OUTCOME_SERVICE_PATH;
use crate::infrastructure::http::controllers::{bulk, instances, launch, outcome};
use crate::infrastructure::http::middleware::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/api/v1/assignments/:id/lti-link",
            get(launch::get_lti_link),
        )
        .route(OUTCOME_SERVICE_PATH, post(outcome::post_outcome))
        // Bulk operations
        .route("/api/v1/bulk/assignments", post(bulk::create_assignments))
        .route(
            "/api/v1/bulk/assignments/cancel",
            post(bulk::cancel_assignments),
        )
        // Instance pool
        .route("/api/v1/lti-instances", get(instances::list_instances))
        .route("/api/v1/lti-instances", post(instances::create_instance))
        .route(
            "/api/v1/lti-instances/:id",
            delete(instances::delete_instance),
        );

    Router::new()
        .route("/health", get(health_handler))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "OK"
}
