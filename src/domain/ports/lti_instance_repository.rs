use crate::domain::entities::LtiInstance;
use crate::domain::errors::DomainResult;
use async_trait::async_trait;

#[async_trait]
pub trait LtiInstanceRepository: Send + Sync {
    /// The instance pool, ordered by position then id.
    async fn list_instances(&self) -> DomainResult<Vec<LtiInstance>>;

    async fn create_instance(&self, instance: &LtiInstance) -> DomainResult<()>;

    async fn delete_instance(&self, id: &str) -> DomainResult<()>;
}
