use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::entities::{Assignment, AssignmentState, LineItem};
use crate::domain::errors::{DomainError, DomainResult};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: AssignmentState,
        to: AssignmentState,
    },
}

/// Validates if an assignment state transition is allowed
pub fn validate_transition(
    from: AssignmentState,
    to: AssignmentState,
) -> Result<(), TransitionError> {
    use AssignmentState::*;

    match (from, to) {
        (Ready, Started) => Ok(()),
        // Relaunch of an attempt in progress
        (Started, Started) => Ok(()),
        (Ready | Started, Completed) => Ok(()),
        (Ready | Started, Cancelled) => Ok(()),

        _ => Err(TransitionError::InvalidTransition { from, to }),
    }
}

/// Checks that a launch may be built for the assignment.
///
/// The state must be ready or started, and the line item must have attempts
/// left. The error message tells which of the two rules failed.
pub fn is_processable(assignment: &Assignment, line_item: &LineItem) -> DomainResult<()> {
    if assignment.state.is_terminal() {
        return Err(DomainError::NotProcessable(format!(
            "Assignment with id '{}' is in state '{}' and cannot be launched",
            assignment.id, assignment.state
        )));
    }

    if !line_item.has_unlimited_attempts() && assignment.attempts_count >= line_item.max_attempts
    {
        return Err(DomainError::NotProcessable(format!(
            "Assignment with id '{}' has exhausted its attempts ({} of {})",
            assignment.id, assignment.attempts_count, line_item.max_attempts
        )));
    }

    Ok(())
}

/// Checks the line item activity window.
pub fn ensure_available(line_item: &LineItem, now: DateTime<Utc>) -> DomainResult<()> {
    if line_item.is_available_at(now) {
        Ok(())
    } else {
        Err(DomainError::NotProcessable(format!(
            "Line item '{}' is not available at {}",
            line_item.slug,
            now.to_rfc3339()
        )))
    }
}

/// Counts a new launch. Only valid after `is_processable` succeeded.
pub fn record_attempt(assignment: &mut Assignment) -> DomainResult<()> {
    validate_transition(assignment.state, AssignmentState::Started)
        .map_err(|e| DomainError::NotProcessable(e.to_string()))?;

    assignment.attempts_count += 1;
    assignment.state = AssignmentState::Started;
    assignment.touch();

    tracing::debug!(
        "Recorded attempt {} for assignment {}",
        assignment.attempts_count,
        assignment.id
    );

    Ok(())
}

/// Marks the assignment completed. Returns whether the state changed.
///
/// Completing twice is a no-op. A cancelled assignment stays cancelled.
pub fn complete(assignment: &mut Assignment) -> bool {
    match validate_transition(assignment.state, AssignmentState::Completed) {
        Ok(()) => {
            assignment.state = AssignmentState::Completed;
            assignment.touch();
            true
        }
        Err(_) => {
            if assignment.state == AssignmentState::Cancelled {
                tracing::warn!(
                    "Ignoring completion of cancelled assignment {}",
                    assignment.id
                );
            }
            false
        }
    }
}

/// Cancels a single assignment. Returns whether the state changed.
pub fn cancel(assignment: &mut Assignment) -> bool {
    if validate_transition(assignment.state, AssignmentState::Cancelled).is_err() {
        return false;
    }

    assignment.state = AssignmentState::Cancelled;
    assignment.touch();
    true
}

/// Cancels every non-terminal assignment and returns the ones that changed.
pub fn cancel_all(assignments: &mut [Assignment]) -> Vec<&Assignment> {
    assignments
        .iter_mut()
        .filter_map(|assignment| {
            let changed = cancel(assignment);
            let assignment: &Assignment = assignment;
            changed.then_some(assignment)
        })
        .collect()
}
