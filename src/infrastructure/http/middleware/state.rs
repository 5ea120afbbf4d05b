use std::sync::Arc;

use crate::application::services::{
    BulkAssignmentService, LaunchService, LtiInstancePool, OutcomeService,
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub launch_service: LaunchService,
    pub outcome_service: OutcomeService,
    pub bulk_assignment_service: BulkAssignmentService,
    pub instance_pool: Arc<LtiInstancePool>,
}
