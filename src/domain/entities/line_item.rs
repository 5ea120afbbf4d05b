use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A gradable delivery that learners are assigned to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub id: String,
    pub uri: String,
    pub slug: String,
    pub label: String,
    /// Zero means unlimited attempts.
    pub max_attempts: u32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    /// Instance used when load balancing is disabled.
    pub lti_instance_id: String,
}

impl LineItem {
    pub fn has_unlimited_attempts(&self) -> bool {
        self.max_attempts == 0
    }

    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        let started = self.start_at.map_or(true, |start| start <= now);
        let not_ended = self.end_at.map_or(true, |end| now <= end);
        started && not_ended
    }
}
