use std::sync::Arc;

use crate::domain::entities::{Assignment, BulkOperation, BulkResult};
use crate::domain::errors::DomainResult;
use crate::domain::ports::{AssignmentRepository, AssignmentUnitOfWork};
use crate::domain::services::assignment_lifecycle;

/// Attribute naming the line item of a bulk create.
pub const LINE_ITEM_SLUG_ATTRIBUTE: &str = "lineItemSlug";

#[derive(Debug, Clone, Copy)]
enum BulkAction {
    Cancel,
    Create,
}

impl BulkAction {
    fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Cancel => "cancel",
            BulkAction::Create => "create",
        }
    }
}

/// All-or-nothing assignment changes across many users.
///
/// Every batch runs in one unit of work. A single failed item rolls back the
/// whole batch, but the per-item results are still reported.
#[derive(Clone)]
pub struct BulkAssignmentService {
    assignments: Arc<dyn AssignmentRepository>,
}

impl BulkAssignmentService {
    pub fn new(assignments: Arc<dyn AssignmentRepository>) -> Self {
        Self { assignments }
    }

    /// Cancels every non-terminal assignment of each listed user.
    pub async fn cancel(&self, operations: &[BulkOperation]) -> DomainResult<BulkResult> {
        self.run(BulkAction::Cancel, operations).await
    }

    /// Gives each listed user a fresh assignment.
    ///
    /// The line item comes from the `lineItemSlug` attribute, or from the
    /// user's most recently updated assignment when the attribute is absent.
    pub async fn create(&self, operations: &[BulkOperation]) -> DomainResult<BulkResult> {
        self.run(BulkAction::Create, operations).await
    }

    async fn run(
        &self,
        action: BulkAction,
        operations: &[BulkOperation],
    ) -> DomainResult<BulkResult> {
        let mut unit_of_work = self.assignments.begin().await?;
        let mut result = BulkResult::default();

        for operation in operations {
            let applied = match action {
                BulkAction::Cancel => cancel_one(unit_of_work.as_mut(), operation).await,
                BulkAction::Create => create_one(unit_of_work.as_mut(), operation).await,
            };

            match applied {
                Ok(success) => result.add(&operation.identifier, success),
                Err(e) => {
                    tracing::error!(
                        "Bulk {} aborted on '{}': {}",
                        action.as_str(),
                        operation.identifier,
                        e
                    );
                    if let Err(rollback_error) = unit_of_work.rollback().await {
                        tracing::error!(
                            "Bulk {} rollback failed: {}",
                            action.as_str(),
                            rollback_error
                        );
                    }
                    record_metric(action, false);
                    return Err(e);
                }
            }
        }

        if result.all_succeeded() {
            unit_of_work.commit().await?;
            result.applied = true;
        } else {
            unit_of_work.rollback().await?;
            tracing::warn!(
                "Bulk {} rolled back: {} of {} items failed",
                action.as_str(),
                result.results().iter().filter(|(_, success)| !success).count(),
                operations.len()
            );
        }

        record_metric(action, result.applied);
        tracing::info!(
            "Bulk {} of {} items finished (applied: {})",
            action.as_str(),
            operations.len(),
            result.applied
        );

        Ok(result)
    }
}

fn record_metric(action: BulkAction, applied: bool) {
    metrics::counter!(
        "bulk_operations_total",
        "operation" => action.as_str(),
        "applied" => if applied { "true" } else { "false" }
    )
    .increment(1);
}

async fn cancel_one(
    unit_of_work: &mut dyn AssignmentUnitOfWork,
    operation: &BulkOperation,
) -> DomainResult<bool> {
    let Some(user) = unit_of_work
        .find_user_by_username(&operation.identifier)
        .await?
    else {
        tracing::error!("Cannot cancel assignments: user '{}' not found", operation.identifier);
        return Ok(false);
    };

    let mut assignments = unit_of_work.find_user_assignments(&user.id).await?;
    let cancelled = assignment_lifecycle::cancel_all(&mut assignments);
    for assignment in &cancelled {
        unit_of_work.persist(assignment).await?;
    }

    tracing::debug!("Cancelled {} assignments of {}", cancelled.len(), user.username);
    Ok(true)
}

async fn create_one(
    unit_of_work: &mut dyn AssignmentUnitOfWork,
    operation: &BulkOperation,
) -> DomainResult<bool> {
    let Some(user) = unit_of_work
        .find_user_by_username(&operation.identifier)
        .await?
    else {
        tracing::error!("Cannot create assignment: user '{}' not found", operation.identifier);
        return Ok(false);
    };

    let line_item_id = match operation.attribute(LINE_ITEM_SLUG_ATTRIBUTE) {
        Some(slug) => match unit_of_work.find_line_item_by_slug(slug).await? {
            Some(line_item) => line_item.id,
            None => {
                tracing::error!(
                    "Cannot create assignment for {}: line item '{}' not found",
                    user.username,
                    slug
                );
                return Ok(false);
            }
        },
        None => match unit_of_work.find_user_assignments(&user.id).await?.pop() {
            Some(last) => last.line_item_id,
            None => {
                tracing::error!(
                    "Cannot create assignment for {}: no line item and no previous assignment",
                    user.username
                );
                return Ok(false);
            }
        },
    };

    let assignment = Assignment::new(user.id, line_item_id);
    unit_of_work.persist(&assignment).await?;

    Ok(true)
}
