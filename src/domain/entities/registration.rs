use serde::{Deserialize, Serialize};

/// Platform-side LTI 1.3 registration of a delivery tool.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lti1p3Registration {
    pub id: String,
    pub platform_issuer: String,
    pub client_id: String,
    pub deployment_id: String,
    pub tool_oidc_initiation_url: String,
    #[serde(skip_serializing)]
    pub message_hint_secret: String,
}

impl std::fmt::Debug for Lti1p3Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lti1p3Registration")
            .field("id", &self.id)
            .field("platform_issuer", &self.platform_issuer)
            .field("client_id", &self.client_id)
            .field("deployment_id", &self.deployment_id)
            .field("tool_oidc_initiation_url", &self.tool_oidc_initiation_url)
            .finish_non_exhaustive()
    }
}
