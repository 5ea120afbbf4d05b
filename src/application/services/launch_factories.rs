use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::entities::{Assignment, LineItem, LtiInstance, User};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{RegistrationRepository, ResourceLink, ResourceLinkLaunchBuilder};
use crate::lti::login_hint::LoginHint;
use crate::lti::oauth::{self, OAuthContext, SignatureMethod};
use crate::lti::{LtiRequest, LtiVersion};

const LTI_1P1_MESSAGE_TYPE: &str = "basic-lti-launch-request";
const LTI_1P1_VERSION: &str = "LTI-1p0";
const LEARNER_ROLE: &str = "Learner";
const LEARNER_ROLE_URI: &str = "http://purl.imsglobal.org/vocab/lis/v2/membership#Learner";

/// Everything a factory needs to assemble one launch.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub assignment: Assignment,
    pub line_item: LineItem,
    pub user: User,
    pub instance: LtiInstance,
    pub context_id: String,
    pub launch_url: String,
}

/// Version specific launch assembly.
#[async_trait]
pub trait LaunchRequestFactory: Send + Sync {
    fn version(&self) -> LtiVersion;

    async fn create(&self, context: &LaunchContext) -> DomainResult<LtiRequest>;
}

/// Launch factories keyed by protocol version, resolved once at startup.
#[derive(Default, Clone)]
pub struct LaunchFactoryRegistry {
    factories: HashMap<LtiVersion, Arc<dyn LaunchRequestFactory>>,
}

impl LaunchFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, factory: Arc<dyn LaunchRequestFactory>) -> Self {
        self.factories.insert(factory.version(), factory);
        self
    }

    pub fn resolve(&self, version: LtiVersion) -> DomainResult<Arc<dyn LaunchRequestFactory>> {
        self.factories.get(&version).cloned().ok_or_else(|| {
            DomainError::Configuration(format!("No launch factory registered for {}", version))
        })
    }
}

/// Signed LTI 1.1 basic launch.
pub struct Lti1p1RequestFactory {
    outcome_service_url: String,
    launch_presentation_return_url: String,
    launch_presentation_locale: String,
    signature_method: SignatureMethod,
}

impl Lti1p1RequestFactory {
    pub fn new(
        outcome_service_url: String,
        launch_presentation_return_url: String,
        launch_presentation_locale: String,
        signature_method: SignatureMethod,
    ) -> Self {
        Self {
            outcome_service_url,
            launch_presentation_return_url,
            launch_presentation_locale,
            signature_method,
        }
    }

    /// Unsigned launch parameters.
    pub fn launch_params(&self, context: &LaunchContext) -> BTreeMap<String, String> {
        let username = context.user.username.clone();
        let assignment_id = context.assignment.id.clone();

        BTreeMap::from([
            ("lti_message_type".to_string(), LTI_1P1_MESSAGE_TYPE.to_string()),
            ("lti_version".to_string(), LTI_1P1_VERSION.to_string()),
            ("context_id".to_string(), context.context_id.clone()),
            ("roles".to_string(), LEARNER_ROLE.to_string()),
            ("user_id".to_string(), username.clone()),
            ("lis_person_name_full".to_string(), username),
            ("resource_link_id".to_string(), assignment_id.clone()),
            ("lis_result_sourcedid".to_string(), assignment_id),
            ("lis_outcome_service_url".to_string(), self.outcome_service_url.clone()),
            (
                "launch_presentation_return_url".to_string(),
                self.launch_presentation_return_url.clone(),
            ),
            (
                "launch_presentation_locale".to_string(),
                self.launch_presentation_locale.clone(),
            ),
        ])
    }

    /// Assembles the launch with an explicit OAuth context.
    pub fn create_with_oauth_context(
        &self,
        context: &LaunchContext,
        oauth_context: &OAuthContext,
    ) -> DomainResult<LtiRequest> {
        let mut params = self.launch_params(context);
        let to_sign: Vec<(String, String)> = params
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let signature = oauth::sign(
            oauth_context,
            &context.launch_url,
            "POST",
            &context.instance.secret,
            &to_sign,
        )?;

        params.extend(oauth_context.params());
        params.insert("oauth_signature".to_string(), signature);

        Ok(LtiRequest {
            link: context.launch_url.clone(),
            version: LtiVersion::V1p1,
            params,
        })
    }
}

#[async_trait]
impl LaunchRequestFactory for Lti1p1RequestFactory {
    fn version(&self) -> LtiVersion {
        LtiVersion::V1p1
    }

    async fn create(&self, context: &LaunchContext) -> DomainResult<LtiRequest> {
        let oauth_context = OAuthContext::new(context.instance.key.clone(), self.signature_method);
        self.create_with_oauth_context(context, &oauth_context)
    }
}

/// LTI 1.3 resource link launch, delegated to a launch builder.
pub struct Lti1p3RequestFactory {
    registrations: Arc<dyn RegistrationRepository>,
    registration_id: String,
    launch_builder: Arc<dyn ResourceLinkLaunchBuilder>,
    launch_presentation_return_url: String,
    launch_presentation_locale: String,
}

impl Lti1p3RequestFactory {
    pub fn new(
        registrations: Arc<dyn RegistrationRepository>,
        registration_id: String,
        launch_builder: Arc<dyn ResourceLinkLaunchBuilder>,
        launch_presentation_return_url: String,
        launch_presentation_locale: String,
    ) -> Self {
        Self {
            registrations,
            registration_id,
            launch_builder,
            launch_presentation_return_url,
            launch_presentation_locale,
        }
    }

    fn claims(&self, context: &LaunchContext) -> Map<String, Value> {
        let claims = json!({
            "https://purl.imsglobal.org/spec/lti/claim/context": {
                "id": context.context_id,
                "label": context.line_item.slug,
                "title": context.line_item.label,
            },
            "https://purl.imsglobal.org/spec/lti/claim/roles": [LEARNER_ROLE_URI],
            "https://purl.imsglobal.org/spec/lti/claim/launch_presentation": {
                "return_url": self.launch_presentation_return_url,
                "locale": self.launch_presentation_locale,
            },
            "https://purl.imsglobal.org/spec/lti/claim/lis": {
                "person_sourcedid": context.user.username,
                "result_sourcedid": context.assignment.id,
            },
        });

        match claims {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

#[async_trait]
impl LaunchRequestFactory for Lti1p3RequestFactory {
    fn version(&self) -> LtiVersion {
        LtiVersion::V1p3
    }

    async fn create(&self, context: &LaunchContext) -> DomainResult<LtiRequest> {
        let registration = self
            .registrations
            .find_registration(&self.registration_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!(
                    "Registration with id '{}' not found",
                    self.registration_id
                ))
            })?;

        let login_hint = LoginHint::new(
            context.user.username.as_str(),
            context.assignment.id.as_str(),
            context.user.group_id.as_deref(),
            &context.line_item.slug,
        );

        let resource_link = ResourceLink {
            identifier: context.assignment.id.clone(),
            url: context.launch_url.clone(),
            title: context.line_item.label.clone(),
        };

        let link = self.launch_builder.build_resource_link_launch(
            &resource_link,
            &registration,
            &login_hint.to_string(),
            &self.claims(context),
        )?;

        Ok(LtiRequest {
            link,
            version: LtiVersion::V1p3,
            params: BTreeMap::new(),
        })
    }
}
