use async_trait::async_trait;
use rosterlink::config::Config;
use rosterlink::domain::entities::{Assignment, AssignmentState, LineItem, LtiInstance, User};
use rosterlink::domain::errors::DomainResult;
use rosterlink::domain::ports::{AssignmentRepository, AssignmentUnitOfWork, LtiInstanceRepository};
use rosterlink::infrastructure::persistence::Database;
use std::collections::HashMap;

pub const APP_BASE_URL: &str = "https://roster.example.com";
pub const OUTCOME_URL: &str = "https://roster.example.com/api/v1/lti1p1/outcome";

pub async fn setup_test_db() -> Database {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");

    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    db
}

/// Instances `instance-1..=size` linking to `http://lb_infra_<n>`.
pub async fn seed_pool(db: &Database, size: i64) -> Vec<LtiInstance> {
    let mut instances = Vec::new();
    for position in 1..=size {
        let mut instance = LtiInstance::new(
            format!("infra {}", position),
            format!("http://lb_infra_{}", position),
            format!("key{}", position),
            format!("secret{}", position),
            position,
        );
        instance.id = format!("instance-{:02}", position);
        db.create_instance(&instance)
            .await
            .expect("Failed to create LTI instance");
        instances.push(instance);
    }
    instances
}

pub async fn seed_user(db: &Database, username: &str, group_id: Option<&str>) -> User {
    let user = User::new(username.to_string(), group_id.map(str::to_string));
    db.insert_user(&user).await.expect("Failed to create user");
    user
}

pub async fn seed_line_item(
    db: &Database,
    id: &str,
    uri: &str,
    max_attempts: u32,
    lti_instance_id: &str,
) -> LineItem {
    let line_item = LineItem {
        id: id.to_string(),
        uri: uri.to_string(),
        slug: format!("delivery-{}", id),
        label: format!("Delivery {}", id),
        max_attempts,
        start_at: None,
        end_at: None,
        lti_instance_id: lti_instance_id.to_string(),
    };
    db.insert_line_item(&line_item)
        .await
        .expect("Failed to create line item");
    line_item
}

pub async fn seed_assignment(
    db: &Database,
    user: &User,
    line_item: &LineItem,
    state: AssignmentState,
    attempts_count: u32,
) -> Assignment {
    let mut assignment = Assignment::new(user.id.clone(), line_item.id.clone());
    assignment.state = state;
    assignment.attempts_count = attempts_count;
    db.save_assignment(&assignment)
        .await
        .expect("Failed to create assignment");
    assignment
}

pub async fn load_assignment(db: &Database, id: &str) -> Assignment {
    db.find_assignment(id)
        .await
        .expect("Failed to load assignment")
        .expect("Assignment not found")
}

/// Configuration with test defaults, overridden by `pairs`.
pub fn test_config(pairs: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("APP_BASE_URL".to_string(), APP_BASE_URL.to_string()),
        ("DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
    ]);
    for (key, value) in pairs {
        vars.insert(key.to_string(), value.to_string());
    }

    Config::from_lookup(|key| vars.get(key).cloned()).expect("Invalid test configuration")
}

/// LTI 1.3 configuration with a complete registration.
pub fn lti1p3_config() -> Config {
    test_config(&[
        ("LTI_VERSION", "1.3.0"),
        ("LTI1P3_REGISTRATION_ID", "reg-1"),
        ("LTI1P3_PLATFORM_ISSUER", APP_BASE_URL),
        ("LTI1P3_CLIENT_ID", "client-1"),
        ("LTI1P3_DEPLOYMENT_ID", "deployment-1"),
        ("LTI1P3_TOOL_OIDC_INITIATION_URL", "https://tool.example.com/oidc/init"),
        ("LTI1P3_MESSAGE_HINT_SECRET", "hint-secret"),
    ])
}

/// Applies `interfere` to the stored assignment right before every
/// compare-and-set write, like a request racing the one under test.
pub struct InterferingRepository {
    pub db: Database,
    pub interfere: fn(&mut Assignment) -> bool,
}

#[async_trait]
impl AssignmentRepository for InterferingRepository {
    async fn find_assignment(&self, id: &str) -> DomainResult<Option<Assignment>> {
        self.db.find_assignment(id).await
    }

    async fn find_line_item(&self, id: &str) -> DomainResult<Option<LineItem>> {
        self.db.find_line_item(id).await
    }

    async fn find_user(&self, id: &str) -> DomainResult<Option<User>> {
        self.db.find_user(id).await
    }

    async fn save_assignment(&self, assignment: &Assignment) -> DomainResult<()> {
        self.db.save_assignment(assignment).await
    }

    async fn compare_and_save(
        &self,
        expected: &Assignment,
        assignment: &Assignment,
    ) -> DomainResult<bool> {
        let mut stored = load_assignment(&self.db, &expected.id).await;
        if (self.interfere)(&mut stored) {
            self.db.save_assignment(&stored).await?;
        }
        self.db.compare_and_save(expected, assignment).await
    }

    async fn begin(&self) -> DomainResult<Box<dyn AssignmentUnitOfWork>> {
        self.db.begin().await
    }
}
