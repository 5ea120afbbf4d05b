use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{find_assignment, LtiInstancePool};
use crate::domain::entities::Assignment;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::AssignmentRepository;
use crate::domain::services::assignment_lifecycle;
use crate::lti::oauth::{self, NonceStore, OAuthContext, SignatureMethod};
use crate::lti::outcome::{parse_replace_result, OutcomeResponse};

/// Default accepted clock skew of outcome `oauth_timestamp`s.
pub const DEFAULT_TIMESTAMP_WINDOW_SECS: i64 = 300;

// Completion retries after losing a race with another writer.
const MAX_COMPLETION_ATTEMPTS: usize = 3;

/// Signed response to a processed outcome.
#[derive(Debug, Clone)]
pub struct OutcomeAcknowledgement {
    pub xml: String,
    /// `Authorization` header value signing `xml`.
    pub authorization: String,
    pub sourced_id: String,
}

/// Consumes LTI 1.1 replaceResult callbacks and completes the assignment.
#[derive(Clone)]
pub struct OutcomeService {
    assignments: Arc<dyn AssignmentRepository>,
    instance_pool: Arc<LtiInstancePool>,
    outcome_service_url: String,
    xml_namespace: String,
    signature_method: SignatureMethod,
    timestamp_window_secs: i64,
    nonces: Arc<Mutex<NonceStore>>,
}

impl OutcomeService {
    pub fn new(
        assignments: Arc<dyn AssignmentRepository>,
        instance_pool: Arc<LtiInstancePool>,
        outcome_service_url: String,
        xml_namespace: String,
        signature_method: SignatureMethod,
    ) -> Self {
        Self {
            assignments,
            instance_pool,
            outcome_service_url,
            xml_namespace,
            signature_method,
            timestamp_window_secs: DEFAULT_TIMESTAMP_WINDOW_SECS,
            nonces: Arc::new(Mutex::new(NonceStore::new())),
        }
    }

    pub fn with_timestamp_window(mut self, seconds: i64) -> Self {
        self.timestamp_window_secs = seconds;
        self
    }

    pub async fn handle(
        &self,
        raw_body: &str,
        authorization: Option<&str>,
    ) -> DomainResult<OutcomeAcknowledgement> {
        let result = self.handle_inner(raw_body, authorization).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(DomainError::SignatureInvalid(_)) => "signature_invalid",
            Err(DomainError::InvalidProtocolBody(_)) => "invalid_body",
            Err(DomainError::NotFound(_)) => "not_found",
            Err(DomainError::NotProcessable(_)) => "not_processable",
            Err(_) => "error",
        };
        metrics::counter!("lti_outcomes_total", "outcome" => outcome).increment(1);

        result
    }

    async fn handle_inner(
        &self,
        raw_body: &str,
        authorization: Option<&str>,
    ) -> DomainResult<OutcomeAcknowledgement> {
        let header = authorization.ok_or_else(|| {
            DomainError::SignatureInvalid("Missing OAuth Authorization header".to_string())
        })?;
        let oauth_params = oauth::parse_authorization_header(header)?;
        let claimed = OAuthContext::from_params(&oauth_params)?;

        let instance = self
            .instance_pool
            .find_by_key(&claimed.consumer_key)
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    "Outcome signed with unknown consumer key '{}'",
                    claimed.consumer_key
                );
                DomainError::SignatureInvalid("Unknown OAuth consumer key".to_string())
            })?;

        let now = Utc::now().timestamp();
        let verified = oauth::verify(
            "POST",
            &self.outcome_service_url,
            &instance.secret,
            &oauth_params,
            &[],
            Some(raw_body.as_bytes()),
        )
        .and_then(|context| {
            oauth::check_timestamp(&context, now, self.timestamp_window_secs)?;
            Ok(context)
        })
        .map_err(|e| {
            tracing::warn!("Rejected outcome from instance {}: {}", instance.label, e);
            DomainError::from(e)
        })?;

        // Only verified requests reach the nonce store.
        self.nonces
            .lock()
            .await
            .check_and_record(&verified, now, self.timestamp_window_secs)
            .map_err(|e| {
                tracing::warn!("Replayed outcome from instance {}: {}", instance.label, e);
                DomainError::from(e)
            })?;

        let request = parse_replace_result(raw_body)?;

        let assignment = self.complete(&request.sourced_id).await?;
        tracing::info!(
            "Outcome for assignment {} from instance {} (score {:?}), state {}",
            assignment.id,
            instance.label,
            request.score,
            assignment.state
        );

        let xml = OutcomeResponse::success(&request).to_xml(&self.xml_namespace);

        let response_context = OAuthContext::new(instance.key.clone(), self.signature_method)
            .with_body(xml.as_bytes());
        let signature = oauth::sign(
            &response_context,
            &self.outcome_service_url,
            "POST",
            &instance.secret,
            &[],
        )?;

        Ok(OutcomeAcknowledgement {
            authorization: oauth::authorization_header(&response_context, &signature),
            xml,
            sourced_id: request.sourced_id,
        })
    }

    /// Completes the assignment unless it is already terminal. The write only
    /// lands on the state that was read; a concurrent change is re-read.
    async fn complete(&self, assignment_id: &str) -> DomainResult<Assignment> {
        for _ in 0..MAX_COMPLETION_ATTEMPTS {
            let loaded = find_assignment(self.assignments.as_ref(), assignment_id).await?;
            let mut assignment = loaded.clone();

            if !assignment_lifecycle::complete(&mut assignment) {
                tracing::debug!(
                    "Assignment {} already in state {}, outcome acknowledged",
                    assignment.id,
                    assignment.state
                );
                return Ok(assignment);
            }

            if self.assignments.compare_and_save(&loaded, &assignment).await? {
                return Ok(assignment);
            }
        }

        Err(DomainError::NotProcessable(format!(
            "Assignment {} kept changing while completing it",
            assignment_id
        )))
    }

    /// Failure envelope in the configured namespace.
    pub fn failure_xml(&self, description: &str) -> String {
        OutcomeResponse::failure(description).to_xml(&self.xml_namespace)
    }
}
