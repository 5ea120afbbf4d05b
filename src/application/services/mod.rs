pub mod bulk_assignment_service;
pub mod instance_pool;
pub mod launch_factories;
pub mod launch_service;
pub mod outcome_service;

pub use bulk_assignment_service::BulkAssignmentService;
pub use instance_pool::LtiInstancePool;
pub use launch_factories::{
    LaunchContext, LaunchFactoryRegistry, LaunchRequestFactory, Lti1p1RequestFactory,
    Lti1p3RequestFactory,
};
pub use launch_service::LaunchService;
pub use outcome_service::{OutcomeAcknowledgement, OutcomeService};

use crate::domain::entities::{Assignment, LineItem, User};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::AssignmentRepository;

pub async fn find_assignment(
    repository: &dyn AssignmentRepository,
    id: &str,
) -> DomainResult<Assignment> {
    repository
        .find_assignment(id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("Assignment with id '{}' not found", id)))
}

pub async fn find_line_item(
    repository: &dyn AssignmentRepository,
    id: &str,
) -> DomainResult<LineItem> {
    repository
        .find_line_item(id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("Line item with id '{}' not found", id)))
}

pub async fn find_user(repository: &dyn AssignmentRepository, id: &str) -> DomainResult<User> {
    repository
        .find_user(id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("User with id '{}' not found", id)))
}
