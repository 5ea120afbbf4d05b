use std::fmt;
use std::str::FromStr;

use crate::domain::errors::DomainError;

const SEPARATOR: &str = "::";

/// LTI 1.3 login hint: `username::assignmentId[::groupId::slug]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginHint {
    pub username: String,
    pub assignment_id: String,
    pub group: Option<GroupHint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHint {
    pub group_id: String,
    pub slug: String,
}

impl LoginHint {
    pub fn new(
        username: impl Into<String>,
        assignment_id: impl Into<String>,
        group_id: Option<&str>,
        slug: &str,
    ) -> Self {
        Self {
            username: username.into(),
            assignment_id: assignment_id.into(),
            group: group_id.map(|group_id| GroupHint {
                group_id: group_id.to_string(),
                slug: slug.to_string(),
            }),
        }
    }
}

impl fmt::Display for LoginHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.username, SEPARATOR, self.assignment_id)?;
        if let Some(group) = &self.group {
            write!(f, "{}{}{}{}", SEPARATOR, group.group_id, SEPARATOR, group.slug)?;
        }
        Ok(())
    }
}

impl FromStr for LoginHint {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        match parts.as_slice() {
            [username, assignment_id] if !username.is_empty() && !assignment_id.is_empty() => {
                Ok(Self {
                    username: username.to_string(),
                    assignment_id: assignment_id.to_string(),
                    group: None,
                })
            }
            [username, assignment_id, group_id, slug]
                if !username.is_empty() && !assignment_id.is_empty() =>
            {
                Ok(Self::new(*username, *assignment_id, Some(*group_id), slug))
            }
            _ => Err(DomainError::InvalidProtocolBody(format!(
                "Invalid login hint '{}'",
                s
            ))),
        }
    }
}
