use chrono::Utc;
use std::sync::Arc;

use super::launch_factories::{LaunchContext, LaunchRequestFactory};
use super::{find_assignment, find_line_item, find_user, LtiInstancePool};
use crate::domain::entities::{LineItem, LtiInstance, User};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::AssignmentRepository;
use crate::domain::services::assignment_lifecycle;
use crate::domain::services::{select, LoadBalancingStrategy};
use crate::lti::launch_link::compose_launch_url;
use crate::lti::LtiRequest;

/// Builds launches for assignments and records the attempt.
#[derive(Clone)]
pub struct LaunchService {
    assignments: Arc<dyn AssignmentRepository>,
    instance_pool: Arc<LtiInstancePool>,
    factory: Arc<dyn LaunchRequestFactory>,
    load_balancing: Option<LoadBalancingStrategy>,
}

impl LaunchService {
    pub fn new(
        assignments: Arc<dyn AssignmentRepository>,
        instance_pool: Arc<LtiInstancePool>,
        factory: Arc<dyn LaunchRequestFactory>,
        load_balancing: Option<LoadBalancingStrategy>,
    ) -> Self {
        Self {
            assignments,
            instance_pool,
            factory,
            load_balancing,
        }
    }

    /// Builds the launch of an assignment.
    ///
    /// Nothing is persisted unless the request was fully assembled; the
    /// attempt is recorded last, and only if the assignment is still as it
    /// was loaded.
    pub async fn build(&self, assignment_id: &str) -> DomainResult<LtiRequest> {
        let version = self.factory.version();

        let result = self.build_inner(assignment_id).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(DomainError::NotProcessable(_)) => "not_processable",
            Err(DomainError::NotFound(_)) => "not_found",
            Err(_) => "error",
        };
        metrics::counter!(
            "lti_launch_requests_total",
            "version" => version.as_str(),
            "outcome" => outcome
        )
        .increment(1);

        result
    }

    async fn build_inner(&self, assignment_id: &str) -> DomainResult<LtiRequest> {
        let mut assignment = find_assignment(self.assignments.as_ref(), assignment_id).await?;
        let line_item = find_line_item(self.assignments.as_ref(), &assignment.line_item_id).await?;
        let user = find_user(self.assignments.as_ref(), &assignment.user_id).await?;

        assignment_lifecycle::is_processable(&assignment, &line_item)?;
        assignment_lifecycle::ensure_available(&line_item, Utc::now())?;

        let (instance, context_id) = self.resolve_instance(&user, &line_item).await?;
        let launch_url = compose_launch_url(&instance.link, &line_item.uri)?;

        let context = LaunchContext {
            assignment: assignment.clone(),
            line_item,
            user,
            instance,
            context_id,
            launch_url,
        };

        let request = self.factory.create(&context).await?;

        let loaded = assignment.clone();
        assignment_lifecycle::record_attempt(&mut assignment)?;
        if !self.assignments.compare_and_save(&loaded, &assignment).await? {
            return Err(DomainError::NotProcessable(format!(
                "Assignment {} changed while its launch was being built",
                assignment.id
            )));
        }

        tracing::info!(
            "Built {} launch for assignment {} on instance {} (attempt {})",
            request.version,
            assignment.id,
            context.instance.label,
            assignment.attempts_count
        );

        Ok(request)
    }

    /// Target instance and LTI context id of a launch.
    async fn resolve_instance(
        &self,
        user: &User,
        line_item: &LineItem,
    ) -> DomainResult<(LtiInstance, String)> {
        match self.load_balancing {
            Some(strategy) => {
                let pool = self.instance_pool.snapshot().await?;
                let key = strategy.selection_key(user)?;
                let instance = select(&pool, key)?.clone();
                tracing::debug!(
                    "Selected instance {} for {} '{}'",
                    instance.label,
                    strategy.as_str(),
                    key
                );
                Ok((instance, strategy.context_id(user, line_item)?))
            }
            None => {
                let instance = self
                    .instance_pool
                    .find_by_id(&line_item.lti_instance_id)
                    .await?
                    .ok_or_else(|| {
                        DomainError::NotFound(format!(
                            "LTI instance with id '{}' not found",
                            line_item.lti_instance_id
                        ))
                    })?;
                Ok((instance, line_item.id.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::Lti1p1RequestFactory;
    use crate::domain::entities::{Assignment, AssignmentState};
    use crate::domain::ports::{AssignmentUnitOfWork, LtiInstanceRepository};
    use crate::lti::oauth::SignatureMethod;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryAssignments {
        assignments: Mutex<HashMap<String, Assignment>>,
        line_items: HashMap<String, LineItem>,
        users: HashMap<String, User>,
    }

    #[async_trait]
    impl AssignmentRepository for MemoryAssignments {
        async fn find_assignment(&self, id: &str) -> DomainResult<Option<Assignment>> {
            Ok(self.assignments.lock().unwrap().get(id).cloned())
        }

        async fn find_line_item(&self, id: &str) -> DomainResult<Option<LineItem>> {
            Ok(self.line_items.get(id).cloned())
        }

        async fn find_user(&self, id: &str) -> DomainResult<Option<User>> {
            Ok(self.users.get(id).cloned())
        }

        async fn save_assignment(&self, assignment: &Assignment) -> DomainResult<()> {
            self.assignments
                .lock()
                .unwrap()
                .insert(assignment.id.clone(), assignment.clone());
            Ok(())
        }

        async fn compare_and_save(
            &self,
            expected: &Assignment,
            assignment: &Assignment,
        ) -> DomainResult<bool> {
            let mut assignments = self.assignments.lock().unwrap();
            let current = &assignments[&expected.id];
            if current.state != expected.state
                || current.attempts_count != expected.attempts_count
            {
                return Ok(false);
            }
            assignments.insert(assignment.id.clone(), assignment.clone());
            Ok(true)
        }

        async fn begin(&self) -> DomainResult<Box<dyn AssignmentUnitOfWork>> {
            Err(DomainError::Internal("not supported".to_string()))
        }
    }

    struct StaticInstances(Vec<LtiInstance>);

    #[async_trait]
    impl LtiInstanceRepository for StaticInstances {
        async fn list_instances(&self) -> DomainResult<Vec<LtiInstance>> {
            Ok(self.0.clone())
        }

        async fn create_instance(&self, _instance: &LtiInstance) -> DomainResult<()> {
            Ok(())
        }

        async fn delete_instance(&self, _id: &str) -> DomainResult<()> {
            Ok(())
        }
    }

    fn pool() -> Vec<LtiInstance> {
        (1..=10)
            .map(|i| {
                let mut instance = LtiInstance::new(
                    format!("infra {}", i),
                    format!("http://lb_infra_{}", i),
                    format!("key{}", i),
                    format!("secret{}", i),
                    i,
                );
                instance.id = format!("instance-{}", i);
                instance
            })
            .collect()
    }

    struct Fixture {
        repository: Arc<MemoryAssignments>,
        assignment_id: String,
    }

    fn fixture(state: AssignmentState, attempts: u32, max_attempts: u32) -> Fixture {
        let user = User::new("user".to_string(), None);
        let line_item = LineItem {
            id: "1".to_string(),
            uri: "http://x/delivery_1.rdf".to_string(),
            slug: "delivery-1".to_string(),
            label: "Delivery 1".to_string(),
            max_attempts,
            start_at: None,
            end_at: None,
            lti_instance_id: "instance-2".to_string(),
        };
        let mut assignment = Assignment::new(user.id.clone(), line_item.id.clone());
        assignment.state = state;
        assignment.attempts_count = attempts;

        let assignment_id = assignment.id.clone();
        let repository = MemoryAssignments {
            assignments: Mutex::new(HashMap::from([(assignment.id.clone(), assignment)])),
            line_items: HashMap::from([(line_item.id.clone(), line_item)]),
            users: HashMap::from([(user.id.clone(), user)]),
        };

        Fixture {
            repository: Arc::new(repository),
            assignment_id,
        }
    }

    fn service(fixture: &Fixture, load_balancing: Option<LoadBalancingStrategy>) -> LaunchService {
        let instance_pool = Arc::new(LtiInstancePool::new(Arc::new(StaticInstances(pool())), None));
        let factory = Arc::new(Lti1p1RequestFactory::new(
            "http://localhost/api/v1/lti1p1/outcome".to_string(),
            "http://localhost".to_string(),
            "en-EN".to_string(),
            SignatureMethod::HmacSha1,
        ));
        LaunchService::new(fixture.repository.clone(), instance_pool, factory, load_balancing)
    }

    fn stored(fixture: &Fixture) -> Assignment {
        fixture.repository.assignments.lock().unwrap()[&fixture.assignment_id].clone()
    }

    #[tokio::test]
    async fn test_balanced_launch_records_attempt() {
        let fixture = fixture(AssignmentState::Ready, 0, 0);
        let request = service(&fixture, Some(LoadBalancingStrategy::Username))
            .build(&fixture.assignment_id)
            .await
            .unwrap();

        assert!(request.link.starts_with("http://lb_infra_4/"));
        assert_eq!(request.params["oauth_consumer_key"], "key4");
        assert_eq!(request.params["context_id"], "1");

        let assignment = stored(&fixture);
        assert_eq!(assignment.state, AssignmentState::Started);
        assert_eq!(assignment.attempts_count, 1);
    }

    #[tokio::test]
    async fn test_static_instance_when_balancer_disabled() {
        let fixture = fixture(AssignmentState::Started, 1, 0);
        let request = service(&fixture, None)
            .build(&fixture.assignment_id)
            .await
            .unwrap();

        assert!(request.link.starts_with("http://lb_infra_2/"));
        assert_eq!(stored(&fixture).attempts_count, 2);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_leave_assignment_untouched() {
        let fixture = fixture(AssignmentState::Started, 3, 3);
        let before = stored(&fixture);

        let result = service(&fixture, None).build(&fixture.assignment_id).await;

        assert!(matches!(result, Err(DomainError::NotProcessable(_))));
        assert_eq!(stored(&fixture), before);
    }

    #[tokio::test]
    async fn test_group_strategy_without_group() {
        let fixture = fixture(AssignmentState::Ready, 0, 0);
        let result = service(&fixture, Some(LoadBalancingStrategy::UserGroupId))
            .build(&fixture.assignment_id)
            .await;

        assert!(matches!(result, Err(DomainError::Indeterminable(_))));
        assert_eq!(stored(&fixture).state, AssignmentState::Ready);
    }

    #[tokio::test]
    async fn test_unknown_assignment() {
        let fixture = fixture(AssignmentState::Ready, 0, 0);
        assert!(matches!(
            service(&fixture, None).build("missing").await,
            Err(DomainError::NotFound(_))
        ));
    }
}
