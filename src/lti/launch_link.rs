use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::domain::errors::{DomainError, DomainResult};

#[derive(Debug, Serialize)]
struct DeliveryReference<'a> {
    delivery: &'a str,
}

/// `{instance_link}/{base64({"delivery": uri})}` with compact JSON.
pub fn compose_launch_url(instance_link: &str, delivery_uri: &str) -> DomainResult<String> {
    let json = serde_json::to_string(&DeliveryReference {
        delivery: delivery_uri,
    })
    .map_err(|e| DomainError::Internal(format!("Cannot encode delivery reference: {}", e)))?;

    Ok(format!(
        "{}/{}",
        instance_link.trim_end_matches('/'),
        STANDARD.encode(json)
    ))
}

/// Recovers the delivery URI from the last path segment of a launch URL.
pub fn decode_delivery_uri(launch_url: &str) -> DomainResult<String> {
    let encoded = launch_url
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| {
            DomainError::InvalidProtocolBody("Launch URL has no delivery segment".to_string())
        })?;

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| DomainError::InvalidProtocolBody(format!("Invalid delivery segment: {}", e)))?;

    let reference: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| DomainError::InvalidProtocolBody(format!("Invalid delivery segment: {}", e)))?;

    reference
        .get("delivery")
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            DomainError::InvalidProtocolBody("Delivery segment has no delivery".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_encoding() {
        let url = compose_launch_url("http://lb_infra_1", "http://x/delivery_2.rdf").unwrap();
        assert_eq!(
            url,
            "http://lb_infra_1/eyJkZWxpdmVyeSI6Imh0dHA6Ly94L2RlbGl2ZXJ5XzIucmRmIn0="
        );
    }

    #[test]
    fn test_trailing_slash_on_instance_link() {
        assert_eq!(
            compose_launch_url("http://lb_infra_1/", "http://x/delivery_2.rdf").unwrap(),
            compose_launch_url("http://lb_infra_1", "http://x/delivery_2.rdf").unwrap()
        );
    }

    #[test]
    fn test_decode_recovers_uri() {
        let url =
            compose_launch_url("https://tool.example.com/launch", "http://x/delivery_7.rdf#i1")
                .unwrap();
        assert_eq!(decode_delivery_uri(&url).unwrap(), "http://x/delivery_7.rdf#i1");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_delivery_uri("http://lb_infra_1/not-base64!").is_err());
        assert!(decode_delivery_uri("http://lb_infra_1/").is_err());
    }
}
