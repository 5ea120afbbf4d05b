use serde::{Deserialize, Serialize};

/// One delivery-tool endpoint of the instance pool.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LtiInstance {
    pub id: String,
    pub label: String,
    pub link: String,
    pub key: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub position: i64,
}

impl LtiInstance {
    pub fn new(label: String, link: String, key: String, secret: String, position: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label,
            link,
            key,
            secret,
            position,
        }
    }
}

// Keeps the signing secret out of logs.
impl std::fmt::Debug for LtiInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LtiInstance")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("link", &self.link)
            .field("key", &self.key)
            .field("position", &self.position)
            .finish()
    }
}
