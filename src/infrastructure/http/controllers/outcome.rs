use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::infrastructure::http::middleware::{ApiError, AppState};

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

// POST /api/v1/lti1p1/outcome - LTI 1.1 Basic Outcomes callback
//
// Answers are always POX envelopes; failures carry codeMajor "failure" with
// the status of the underlying error.
pub async fn post_outcome(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.outcome_service.handle(&body, authorization).await {
        Ok(ack) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, XML_CONTENT_TYPE.to_string()),
                (header::AUTHORIZATION, ack.authorization),
            ],
            ack.xml,
        )
            .into_response(),
        Err(err) => {
            let err = ApiError::from(err);
            tracing::warn!("Outcome rejected: {}", err);
            (
                err.status(),
                [(header::CONTENT_TYPE, XML_CONTENT_TYPE.to_string())],
                state.outcome_service.failure_xml(err.message()),
            )
                .into_response()
        }
    }
}
