//! LTI 1.3 third-party initiated login.
//!
//! The launch link sends the learner's browser to the tool's OIDC initiation
//! endpoint. Everything the platform needs to answer the following
//! authentication request travels in `lti_message_hint`, signed with the
//! registration's hint secret.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde_json::{json, Map, Value};
use sha2::Sha256;
use url::Url;

use crate::domain::entities::Lti1p3Registration;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{ResourceLink, ResourceLinkLaunchBuilder};
use crate::lti::oauth::constant_time_eq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, Default)]
pub struct OidcInitiationLaunchBuilder;

impl OidcInitiationLaunchBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl ResourceLinkLaunchBuilder for OidcInitiationLaunchBuilder {
    fn build_resource_link_launch(
        &self,
        resource_link: &ResourceLink,
        registration: &Lti1p3Registration,
        login_hint: &str,
        claims: &Map<String, Value>,
    ) -> DomainResult<String> {
        let mut url = Url::parse(&registration.tool_oidc_initiation_url).map_err(|e| {
            DomainError::Configuration(format!(
                "Invalid OIDC initiation URL '{}': {}",
                registration.tool_oidc_initiation_url, e
            ))
        })?;

        let payload = json!({
            "registration_id": registration.id,
            "resource_link": {
                "id": resource_link.identifier,
                "title": resource_link.title,
                "url": resource_link.url,
            },
            "claims": claims,
            "iat": chrono::Utc::now().timestamp(),
        });
        let message_hint = sign_message_hint(&payload, &registration.message_hint_secret)?;

        url.query_pairs_mut()
            .append_pair("iss", &registration.platform_issuer)
            .append_pair("login_hint", login_hint)
            .append_pair("target_link_uri", &resource_link.url)
            .append_pair("lti_message_hint", &message_hint)
            .append_pair("lti_deployment_id", &registration.deployment_id)
            .append_pair("client_id", &registration.client_id);

        Ok(url.into())
    }
}

fn mac(secret: &str) -> DomainResult<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| DomainError::Internal("Invalid message hint secret".to_string()))
}

/// `base64url(payload).base64url(hmac_sha256(payload))`
pub fn sign_message_hint(payload: &Value, secret: &str) -> DomainResult<String> {
    let encoded = URL_SAFE_NO_PAD.encode(payload.to_string());

    let mut mac = mac(secret)?;
    mac.update(encoded.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", encoded, signature))
}

/// Checks a message hint and returns its payload.
pub fn verify_message_hint(hint: &str, secret: &str) -> DomainResult<Value> {
    let invalid = || DomainError::SignatureInvalid("Invalid LTI message hint".to_string());

    let (encoded, signature) = hint.split_once('.').ok_or_else(invalid)?;

    let mut mac = mac(secret)?;
    mac.update(encoded.as_bytes());
    let expected = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    if !constant_time_eq(&expected, signature) {
        return Err(invalid());
    }

    let payload = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| invalid())?;
    serde_json::from_slice(&payload).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Lti1p3Registration {
        Lti1p3Registration {
            id: "reg-1".to_string(),
            platform_issuer: "https://roster.example.com".to_string(),
            client_id: "client-1".to_string(),
            deployment_id: "deployment-1".to_string(),
            tool_oidc_initiation_url: "https://tool.example.com/oidc/init".to_string(),
            message_hint_secret: "hint-secret".to_string(),
        }
    }

    fn resource_link() -> ResourceLink {
        ResourceLink {
            identifier: "assignment-1".to_string(),
            url: "http://lb_infra_1/eyJkZWxpdmVyeSI6Imh0dHA6Ly94L2RlbGl2ZXJ5XzIucmRmIn0="
                .to_string(),
            title: "Delivery 2".to_string(),
        }
    }

    #[test]
    fn test_builds_initiation_redirect() {
        let link = OidcInitiationLaunchBuilder::new()
            .build_resource_link_launch(
                &resource_link(),
                &registration(),
                "user1::assignment-1",
                &Map::new(),
            )
            .unwrap();

        let url = Url::parse(&link).unwrap();
        assert_eq!(url.host_str(), Some("tool.example.com"));
        assert_eq!(url.path(), "/oidc/init");

        let query: Map<String, Value> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        assert_eq!(query["iss"], "https://roster.example.com");
        assert_eq!(query["login_hint"], "user1::assignment-1");
        assert_eq!(query["target_link_uri"], resource_link().url.as_str());
        assert_eq!(query["client_id"], "client-1");
        assert_eq!(query["lti_deployment_id"], "deployment-1");

        let hint = query["lti_message_hint"].as_str().unwrap();
        let payload = verify_message_hint(hint, "hint-secret").unwrap();
        assert_eq!(payload["resource_link"]["id"], "assignment-1");
        assert_eq!(payload["registration_id"], "reg-1");
    }

    #[test]
    fn test_tampered_message_hint() {
        let hint = sign_message_hint(&json!({"a": 1}), "hint-secret").unwrap();
        assert!(verify_message_hint(&hint, "other-secret").is_err());

        let signature = hint.split_once('.').unwrap().1;
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode(r#"{"a":2}"#), signature);
        assert!(verify_message_hint(&forged, "hint-secret").is_err());
        assert!(verify_message_hint("no-dot", "hint-secret").is_err());
    }

    #[test]
    fn test_invalid_initiation_url() {
        let mut registration = registration();
        registration.tool_oidc_initiation_url = "not a url".to_string();

        assert!(matches!(
            OidcInitiationLaunchBuilder::new().build_resource_link_launch(
                &resource_link(),
                &registration,
                "user1::assignment-1",
                &Map::new(),
            ),
            Err(DomainError::Configuration(_))
        ));
    }
}
