use std::env;

use crate::domain::entities::Lti1p3Registration;
use crate::domain::services::LoadBalancingStrategy;
use crate::lti::oauth::SignatureMethod;
use crate::lti::outcome::DEFAULT_XML_NAMESPACE;
use crate::lti::LtiVersion;

/// Path of the LTI 1.1 outcome callback, relative to `APP_BASE_URL`.
pub const OUTCOME_SERVICE_PATH: &str = "/api/v1/lti1p1/outcome";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub app_base_url: String,
    pub lti: LtiConfig,
    pub otel_exporter_endpoint: Option<String>,
    pub service_name: String,
    pub metrics_port: u16,
}

#[derive(Clone, Debug)]
pub struct LtiConfig {
    pub version: LtiVersion,
    /// `None` when the instance load balancer is disabled.
    pub load_balancing: Option<LoadBalancingStrategy>,
    pub launch_presentation_return_url: String,
    pub launch_presentation_locale: String,
    pub signature_method: SignatureMethod,
    pub outcome_xml_namespace: String,
    pub instance_cache_ttl_seconds: Option<u64>,
    /// Accepted clock skew of inbound OAuth timestamps.
    pub oauth_timestamp_window_seconds: u32,
    pub lti1p3_registration: Option<Lti1p3Registration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = var("DATABASE_URL", "sqlite://rosterlink.db?mode=rwc");

        let server_host = var("SERVER_HOST", "127.0.0.1");

        let server_port = var("SERVER_PORT", "3000")
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let app_base_url = var("APP_BASE_URL", &format!("http://{}:{}", server_host, server_port))
            .trim_end_matches('/')
            .to_string();

        let version = var("LTI_VERSION", "1.1.1")
            .parse::<LtiVersion>()
            .map_err(ConfigError::UnknownLtiVersion)?;

        let balancer_enabled = parse_bool(
            "LTI_ENABLE_INSTANCES_LOAD_BALANCER",
            &var("LTI_ENABLE_INSTANCES_LOAD_BALANCER", "false"),
        )?;
        let load_balancing = if balancer_enabled {
            Some(
                var("LTI_INSTANCE_LOAD_BALANCING_STRATEGY", "username")
                    .parse::<LoadBalancingStrategy>()
                    .map_err(ConfigError::UnknownLoadBalancingStrategy)?,
            )
        } else {
            None
        };

        let signature_method = var("LTI_SIGNATURE_METHOD", "HMAC-SHA1")
            .parse::<SignatureMethod>()
            .map_err(|e| ConfigError::UnsupportedSignatureMethod(e.to_string()))?;

        let instance_cache_ttl_seconds = match lookup("LTI_INSTANCE_CACHE_TTL_SECONDS") {
            Some(value) => Some(value.parse().map_err(|_| ConfigError::InvalidNumber {
                name: "LTI_INSTANCE_CACHE_TTL_SECONDS",
                value,
            })?),
            None => None,
        };

        let oauth_timestamp_window_seconds = var("LTI_OAUTH_TIMESTAMP_WINDOW_SECONDS", "300");
        let oauth_timestamp_window_seconds = oauth_timestamp_window_seconds
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidNumber {
                name: "LTI_OAUTH_TIMESTAMP_WINDOW_SECONDS",
                value: oauth_timestamp_window_seconds.clone(),
            })?;

        let lti1p3_registration = match lookup("LTI1P3_REGISTRATION_ID") {
            Some(id) => {
                let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));
                Some(Lti1p3Registration {
                    id,
                    platform_issuer: required("LTI1P3_PLATFORM_ISSUER")?,
                    client_id: required("LTI1P3_CLIENT_ID")?,
                    deployment_id: required("LTI1P3_DEPLOYMENT_ID")?,
                    tool_oidc_initiation_url: required("LTI1P3_TOOL_OIDC_INITIATION_URL")?,
                    message_hint_secret: required("LTI1P3_MESSAGE_HINT_SECRET")?,
                })
            }
            None => None,
        };

        if version == LtiVersion::V1p3 && lti1p3_registration.is_none() {
            return Err(ConfigError::Missing("LTI1P3_REGISTRATION_ID"));
        }

        let lti = LtiConfig {
            version,
            load_balancing,
            launch_presentation_return_url: var(
                "LTI_LAUNCH_PRESENTATION_RETURN_URL",
                &app_base_url,
            ),
            launch_presentation_locale: var("LTI_LAUNCH_PRESENTATION_LOCALE", "en-EN"),
            signature_method,
            outcome_xml_namespace: var("LTI_OUTCOME_XML_NAMESPACE", DEFAULT_XML_NAMESPACE),
            instance_cache_ttl_seconds,
            oauth_timestamp_window_seconds,
            lti1p3_registration,
        };

        let otel_exporter_endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT");

        let service_name = var("SERVICE_NAME", "rosterlink");

        let metrics_port = var("METRICS_PORT", "9000").parse().unwrap_or(9000);

        Ok(Config {
            database_url,
            server_host,
            server_port,
            app_base_url,
            lti,
            otel_exporter_endpoint,
            service_name,
            metrics_port,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Absolute URL delivery tools post outcomes to.
    pub fn outcome_service_url(&self) -> String {
        format!("{}{}", self.app_base_url, OUTCOME_SERVICE_PATH)
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean {
            name,
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Unknown LTI version '{0}' (expected 1.1.1 or 1.3.0)")]
    UnknownLtiVersion(String),

    #[error("Unknown load balancing strategy '{0}' (expected username or userGroupId)")]
    UnknownLoadBalancingStrategy(String),

    #[error("Unsupported signature method: {0}")]
    UnsupportedSignatureMethod(String),

    #[error("{name} must be a boolean, got '{value}'")]
    InvalidBoolean { name: &'static str, value: String },

    #[error("{name} must be a number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{0} environment variable not set")]
    Missing(&'static str),
}
