//! LTI protocol pieces: OAuth1 signing, launch links, login hints and the
//! IMS POX outcome envelopes.

pub mod launch_link;
pub mod login_hint;
pub mod oauth;
pub mod outcome;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Supported LTI protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LtiVersion {
    V1p1,
    V1p3,
}

impl LtiVersion {
    /// Value reported to API clients as `ltiVersion`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LtiVersion::V1p1 => "LTI-1p1",
            LtiVersion::V1p3 => "LTI-1p3",
        }
    }
}

impl fmt::Display for LtiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LtiVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for LtiVersion {
    type Err = String;

    /// Accepts the configuration spellings (`1.1.1`, `1.3.0`) as well as the
    /// wire names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1.1" | "1.1.1" | "LTI-1p1" => Ok(LtiVersion::V1p1),
            "1.3" | "1.3.0" | "LTI-1p3" => Ok(LtiVersion::V1p3),
            other => Err(other.to_string()),
        }
    }
}

/// A launch ready to be handed to the learner's browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LtiRequest {
    #[serde(rename = "ltiLink")]
    pub link: String,
    #[serde(rename = "ltiVersion")]
    pub version: LtiVersion,
    #[serde(rename = "ltiParams")]
    pub params: BTreeMap<String, String>,
}
