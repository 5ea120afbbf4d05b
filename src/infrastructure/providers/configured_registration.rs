use async_trait::async_trait;

use crate::domain::entities::Lti1p3Registration;
use crate::domain::errors::DomainResult;
use crate::domain::ports::RegistrationRepository;

/// Registrations known from configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredRegistrationRepository {
    registrations: Vec<Lti1p3Registration>,
}

impl ConfiguredRegistrationRepository {
    pub fn new(registrations: Vec<Lti1p3Registration>) -> Self {
        Self { registrations }
    }
}

#[async_trait]
impl RegistrationRepository for ConfiguredRegistrationRepository {
    async fn find_registration(&self, id: &str) -> DomainResult<Option<Lti1p3Registration>> {
        Ok(self
            .registrations
            .iter()
            .find(|registration| registration.id == id)
            .cloned())
    }
}
