use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::entities::{LineItem, User};
use crate::domain::errors::{DomainError, DomainResult};

/// Index into a pool of `pool_size` instances for `key`.
///
/// The index is the sum of the character codes of the hex MD5 digest of the
/// key, modulo the pool size. The same key always lands on the same index as
/// long as the pool size does not change.
pub fn select_index(pool_size: usize, key: &str) -> DomainResult<usize> {
    if pool_size == 0 {
        return Err(DomainError::Indeterminable(
            "the LTI instance pool is empty".to_string(),
        ));
    }

    let digest = hex::encode(Md5::digest(key.as_bytes()));
    let sum: usize = digest.bytes().map(usize::from).sum();

    Ok(sum % pool_size)
}

/// Picks the pool member serving `key`. Pool order must be stable between calls.
pub fn select<'a, T>(pool: &'a [T], key: &str) -> DomainResult<&'a T> {
    let index = select_index(pool.len(), key)?;
    Ok(&pool[index])
}

/// Which user attribute drives instance selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadBalancingStrategy {
    #[serde(rename = "username")]
    Username,
    #[serde(rename = "userGroupId")]
    UserGroupId,
}

impl LoadBalancingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadBalancingStrategy::Username => "username",
            LoadBalancingStrategy::UserGroupId => "userGroupId",
        }
    }

    pub fn selection_key<'a>(&self, user: &'a User) -> DomainResult<&'a str> {
        match self {
            LoadBalancingStrategy::Username => Ok(user.username.as_str()),
            LoadBalancingStrategy::UserGroupId => user.group_id.as_deref().ok_or_else(|| {
                DomainError::Indeterminable(format!(
                    "User with username '{}' has no group id",
                    user.username
                ))
            }),
        }
    }

    /// The LTI `context_id` of a balanced launch.
    ///
    /// Group balancing uses the group id as is, so every member of a group
    /// shares one context on the delivery tool.
    pub fn context_id(&self, user: &User, line_item: &LineItem) -> DomainResult<String> {
        match self {
            LoadBalancingStrategy::Username => Ok(line_item.id.clone()),
            LoadBalancingStrategy::UserGroupId => self.selection_key(user).map(str::to_string),
        }
    }
}

impl FromStr for LoadBalancingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "username" => Ok(LoadBalancingStrategy::Username),
            "userGroupId" => Ok(LoadBalancingStrategy::UserGroupId),
            other => Err(other.to_string()),
        }
    }
}
