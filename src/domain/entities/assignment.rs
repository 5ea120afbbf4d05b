use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::DomainError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentState {
    Ready,
    Started,
    Completed,
    Cancelled,
}

impl AssignmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentState::Ready => "ready",
            AssignmentState::Started => "started",
            AssignmentState::Completed => "completed",
            AssignmentState::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled assignments accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssignmentState::Completed | AssignmentState::Cancelled)
    }
}

impl fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(AssignmentState::Ready),
            "started" => Ok(AssignmentState::Started),
            "completed" => Ok(AssignmentState::Completed),
            "cancelled" => Ok(AssignmentState::Cancelled),
            other => Err(DomainError::Internal(format!(
                "Unknown assignment state '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub id: String,
    pub user_id: String,
    pub line_item_id: String,
    pub state: AssignmentState,
    pub attempts_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(user_id: String, line_item_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            line_item_id,
            state: AssignmentState::Ready,
            attempts_count: 0,
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
