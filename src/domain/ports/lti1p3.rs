use crate::domain::entities::Lti1p3Registration;
use crate::domain::errors::DomainResult;
use async_trait::async_trait;
use serde_json::{Map, Value};

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn find_registration(&self, id: &str) -> DomainResult<Option<Lti1p3Registration>>;
}

/// The resource link an LTI 1.3 launch points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLink {
    pub identifier: String,
    pub url: String,
    pub title: String,
}

/// Builds a ready-to-redirect LTI 1.3 resource link launch URL.
pub trait ResourceLinkLaunchBuilder: Send + Sync {
    fn build_resource_link_launch(
        &self,
        resource_link: &ResourceLink,
        registration: &Lti1p3Registration,
        login_hint: &str,
        claims: &Map<String, Value>,
    ) -> DomainResult<String>;
}
