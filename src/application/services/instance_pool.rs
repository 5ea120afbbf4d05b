use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::domain::entities::LtiInstance;
use crate::domain::errors::DomainResult;
use crate::domain::ports::LtiInstanceRepository;

struct CachedPool {
    instances: Arc<[LtiInstance]>,
    loaded_at: Instant,
}

/// Snapshot cache of the LTI instance pool.
///
/// Selection is only deterministic against a stable pool, so every change made
/// through this type drops the snapshot before returning.
pub struct LtiInstancePool {
    repository: Arc<dyn LtiInstanceRepository>,
    ttl: Option<Duration>,
    cache: RwLock<Option<CachedPool>>,
}

impl LtiInstancePool {
    pub fn new(repository: Arc<dyn LtiInstanceRepository>, ttl: Option<Duration>) -> Self {
        Self {
            repository,
            ttl,
            cache: RwLock::new(None),
        }
    }

    fn is_fresh(&self, cached: &CachedPool) -> bool {
        self.ttl
            .map_or(true, |ttl| cached.loaded_at.elapsed() < ttl)
    }

    /// The current pool, in selection order.
    pub async fn snapshot(&self) -> DomainResult<Arc<[LtiInstance]>> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if self.is_fresh(cached) {
                return Ok(cached.instances.clone());
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref() {
            if self.is_fresh(cached) {
                return Ok(cached.instances.clone());
            }
        }

        let instances: Arc<[LtiInstance]> = self.repository.list_instances().await?.into();
        tracing::debug!("Loaded LTI instance pool ({} instances)", instances.len());

        *cache = Some(CachedPool {
            instances: instances.clone(),
            loaded_at: Instant::now(),
        });

        Ok(instances)
    }

    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
        tracing::info!("LTI instance pool cache invalidated");
    }

    pub async fn find_by_id(&self, id: &str) -> DomainResult<Option<LtiInstance>> {
        Ok(self
            .snapshot()
            .await?
            .iter()
            .find(|instance| instance.id == id)
            .cloned())
    }

    pub async fn find_by_key(&self, key: &str) -> DomainResult<Option<LtiInstance>> {
        Ok(self
            .snapshot()
            .await?
            .iter()
            .find(|instance| instance.key == key)
            .cloned())
    }

    pub async fn add_instance(&self, instance: &LtiInstance) -> DomainResult<()> {
        self.repository.create_instance(instance).await?;
        self.invalidate().await;
        Ok(())
    }

    pub async fn remove_instance(&self, id: &str) -> DomainResult<()> {
        self.repository.delete_instance(id).await?;
        self.invalidate().await;
        Ok(())
    }
}
