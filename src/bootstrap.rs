use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use crate::application::services::{
    BulkAssignmentService, LaunchFactoryRegistry, LaunchService, Lti1p1RequestFactory,
    Lti1p3RequestFactory, LtiInstancePool, OutcomeService,
};
use crate::config::Config;
use crate::domain::ports::{AssignmentRepository, LtiInstanceRepository};
use crate::infrastructure::http::middleware::AppState;
use crate::infrastructure::persistence::Database;
use crate::infrastructure::providers::{
    ConfiguredRegistrationRepository, OidcInitiationLaunchBuilder,
};

/// Registers a launch factory per supported version.
///
/// The LTI 1.3 factory only exists when a registration is configured.
pub fn build_launch_factories(config: &Config) -> LaunchFactoryRegistry {
    let lti = &config.lti;

    let mut registry = LaunchFactoryRegistry::new().register(Arc::new(Lti1p1RequestFactory::new(
        config.outcome_service_url(),
        lti.launch_presentation_return_url.clone(),
        lti.launch_presentation_locale.clone(),
        lti.signature_method,
    )));

    if let Some(registration) = &lti.lti1p3_registration {
        registry = registry.register(Arc::new(Lti1p3RequestFactory::new(
            Arc::new(ConfiguredRegistrationRepository::new(vec![registration.clone()])),
            registration.id.clone(),
            Arc::new(OidcInitiationLaunchBuilder::new()),
            lti.launch_presentation_return_url.clone(),
            lti.launch_presentation_locale.clone(),
        )));
    }

    registry
}

pub fn build_app_state(db: Database, config: &Config) -> anyhow::Result<AppState> {
    let assignments: Arc<dyn AssignmentRepository> = Arc::new(db.clone());
    let instances: Arc<dyn LtiInstanceRepository> = Arc::new(db);

    let instance_pool = Arc::new(LtiInstancePool::new(
        instances,
        config.lti.instance_cache_ttl_seconds.map(Duration::from_secs),
    ));

    // Version dispatch is settled once, here.
    let factory = build_launch_factories(config)
        .resolve(config.lti.version)
        .with_context(|| format!("No launch factory for {}", config.lti.version))?;

    match config.lti.load_balancing {
        Some(strategy) => tracing::info!(
            "LTI {} launches, instance load balancing by {}",
            config.lti.version,
            strategy.as_str()
        ),
        None => tracing::info!(
            "LTI {} launches, instance load balancing disabled",
            config.lti.version
        ),
    }

    let launch_service = LaunchService::new(
        assignments.clone(),
        instance_pool.clone(),
        factory,
        config.lti.load_balancing,
    );

    let outcome_service = OutcomeService::new(
        assignments.clone(),
        instance_pool.clone(),
        config.outcome_service_url(),
        config.lti.outcome_xml_namespace.clone(),
        config.lti.signature_method,
    )
    .with_timestamp_window(i64::from(config.lti.oauth_timestamp_window_seconds));

    let bulk_assignment_service = BulkAssignmentService::new(assignments);

    Ok(AppState {
        launch_service,
        outcome_service,
        bulk_assignment_service,
        instance_pool,
    })
}
