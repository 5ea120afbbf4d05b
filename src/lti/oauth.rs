//! OAuth 1.0a request signing as used by LTI 1.1 launches and outcome calls.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha1::{Digest, Sha1};
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::domain::errors::DomainError;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

pub const OAUTH_VERSION: &str = "1.0";

/// Base64 SHA-1 of an empty body.
pub const EMPTY_BODY_HASH: &str = "2jmj7l5rSw0yVb/vlWAYkK/YBwk=";

const SIGNATURE_PARAM: &str = "oauth_signature";
const REALM_PARAM: &str = "realm";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OAuthError {
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),
    #[error("Unsupported signature method '{0}'")]
    UnsupportedSignatureMethod(String),
    #[error("Missing OAuth parameter '{0}'")]
    MissingParameter(&'static str),
    #[error("Malformed OAuth Authorization header")]
    MalformedHeader,
    #[error("Signature mismatch")]
    SignatureMismatch,
    #[error("Body hash mismatch")]
    BodyHashMismatch,
    #[error("Invalid signing key")]
    InvalidKey,
    #[error("OAuth timestamp outside the accepted window")]
    StaleTimestamp,
    #[error("OAuth nonce already used")]
    ReplayedNonce,
}

impl From<OAuthError> for DomainError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::InvalidUrl(_) => DomainError::Configuration(err.to_string()),
            OAuthError::InvalidKey => DomainError::Internal(err.to_string()),
            _ => DomainError::SignatureInvalid(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureMethod {
    HmacSha1,
    HmacSha256,
    Plaintext,
}

impl SignatureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMethod::HmacSha1 => "HMAC-SHA1",
            SignatureMethod::HmacSha256 => "HMAC-SHA256",
            SignatureMethod::Plaintext => "PLAINTEXT",
        }
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureMethod {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HMAC-SHA1" => Ok(SignatureMethod::HmacSha1),
            "HMAC-SHA256" => Ok(SignatureMethod::HmacSha256),
            "PLAINTEXT" => Ok(SignatureMethod::Plaintext),
            other => Err(OAuthError::UnsupportedSignatureMethod(other.to_string())),
        }
    }
}

/// Protocol fields of a single signing operation.
///
/// Build a new one for every request; nonce and timestamp are per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthContext {
    pub realm: String,
    pub consumer_key: String,
    pub nonce: String,
    pub signature_method: SignatureMethod,
    pub timestamp: i64,
    pub version: String,
    pub body_hash: Option<String>,
}

impl OAuthContext {
    /// Fresh context for an outbound request without body.
    pub fn new(consumer_key: impl Into<String>, signature_method: SignatureMethod) -> Self {
        Self {
            realm: String::new(),
            consumer_key: consumer_key.into(),
            nonce: generate_nonce(),
            signature_method,
            timestamp: chrono::Utc::now().timestamp(),
            version: OAUTH_VERSION.to_string(),
            body_hash: Some(EMPTY_BODY_HASH.to_string()),
        }
    }

    pub fn with_body(mut self, body: &[u8]) -> Self {
        self.body_hash = Some(body_hash(body));
        self
    }

    /// Reads a context back from received `oauth_*` parameters.
    pub fn from_params(params: &[(String, String)]) -> Result<Self, OAuthError> {
        let lookup = |name: &'static str| {
            params
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };

        let timestamp = lookup("oauth_timestamp")
            .ok_or(OAuthError::MissingParameter("oauth_timestamp"))?
            .parse::<i64>()
            .map_err(|_| OAuthError::MalformedHeader)?;

        Ok(Self {
            realm: lookup(REALM_PARAM).unwrap_or_default(),
            consumer_key: lookup("oauth_consumer_key")
                .ok_or(OAuthError::MissingParameter("oauth_consumer_key"))?,
            nonce: lookup("oauth_nonce").ok_or(OAuthError::MissingParameter("oauth_nonce"))?,
            signature_method: lookup("oauth_signature_method")
                .ok_or(OAuthError::MissingParameter("oauth_signature_method"))?
                .parse()?,
            timestamp,
            version: lookup("oauth_version").unwrap_or_else(|| OAUTH_VERSION.to_string()),
            body_hash: lookup("oauth_body_hash"),
        })
    }

    /// The `oauth_*` parameters of this context, without the signature.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(6);
        if let Some(body_hash) = &self.body_hash {
            params.push(("oauth_body_hash".to_string(), body_hash.clone()));
        }
        params.push(("oauth_consumer_key".to_string(), self.consumer_key.clone()));
        params.push(("oauth_nonce".to_string(), self.nonce.clone()));
        params.push((
            "oauth_signature_method".to_string(),
            self.signature_method.as_str().to_string(),
        ));
        params.push(("oauth_timestamp".to_string(), self.timestamp.to_string()));
        params.push(("oauth_version".to_string(), self.version.clone()));
        params
    }
}

/// Random opaque nonce (128 bits, hex).
pub fn generate_nonce() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

pub fn body_hash(body: &[u8]) -> String {
    STANDARD.encode(Sha1::digest(body))
}

/// RFC 3986 encoding: everything but `A-Z a-z 0-9 - . _ ~` is escaped.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Scheme and host lowercased, default port dropped, query and fragment removed.
pub fn normalize_url(url: &Url) -> Result<String, OAuthError> {
    let host = url
        .host_str()
        .ok_or_else(|| OAuthError::InvalidUrl(url.to_string()))?;

    let mut normalized = format!("{}://{}", url.scheme(), host.to_ascii_lowercase());
    if let Some(port) = url.port() {
        normalized.push_str(&format!(":{}", port));
    }
    normalized.push_str(url.path());

    Ok(normalized)
}

/// Builds the OAuth signature base string.
///
/// `params` must already contain the `oauth_*` fields; `oauth_signature` and
/// `realm` are skipped. Query parameters of `url` are folded in.
pub fn signature_base_string(
    http_method: &str,
    url: &str,
    params: &[(String, String)],
) -> Result<String, OAuthError> {
    let parsed = Url::parse(url).map_err(|_| OAuthError::InvalidUrl(url.to_string()))?;

    let mut encoded: Vec<(String, String)> = params
        .iter()
        .filter(|(key, _)| key != SIGNATURE_PARAM && key != REALM_PARAM)
        .map(|(key, value)| (percent_encode(key), percent_encode(value)))
        .chain(
            parsed
                .query_pairs()
                .map(|(key, value)| (percent_encode(&key), percent_encode(&value))),
        )
        .collect();
    encoded.sort();

    let parameter_string = encoded
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!(
        "{}&{}&{}",
        http_method.to_ascii_uppercase(),
        percent_encode(&normalize_url(&parsed)?),
        percent_encode(&parameter_string)
    ))
}

/// Signs a request. Pure for a given context: same inputs, same signature.
pub fn sign(
    context: &OAuthContext,
    url: &str,
    http_method: &str,
    secret: &str,
    params: &[(String, String)],
) -> Result<String, OAuthError> {
    let mut all_params = context.params();
    all_params.extend(params.iter().cloned());

    let base_string = signature_base_string(http_method, url, &all_params)?;
    compute_signature(context.signature_method, &base_string, secret)
}

fn compute_signature(
    method: SignatureMethod,
    base_string: &str,
    consumer_secret: &str,
) -> Result<String, OAuthError> {
    // No token secret in LTI.
    let key = format!("{}&", percent_encode(consumer_secret));

    let signature = match method {
        SignatureMethod::HmacSha1 => {
            let mut mac =
                HmacSha1::new_from_slice(key.as_bytes()).map_err(|_| OAuthError::InvalidKey)?;
            mac.update(base_string.as_bytes());
            STANDARD.encode(mac.finalize().into_bytes())
        }
        SignatureMethod::HmacSha256 => {
            let mut mac =
                HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| OAuthError::InvalidKey)?;
            mac.update(base_string.as_bytes());
            STANDARD.encode(mac.finalize().into_bytes())
        }
        SignatureMethod::Plaintext => key,
    };

    Ok(signature)
}

/// Verifies a received request against the consumer secret.
///
/// `oauth_params` are the parameters of the Authorization header (signature
/// included), `request_params` any other signed parameters. When a `body` is
/// given the request must carry `oauth_body_hash` and the body must hash to
/// it, since the body itself is not part of the base string.
pub fn verify(
    http_method: &str,
    url: &str,
    secret: &str,
    oauth_params: &[(String, String)],
    request_params: &[(String, String)],
    body: Option<&[u8]>,
) -> Result<OAuthContext, OAuthError> {
    let context = OAuthContext::from_params(oauth_params)?;

    let received = oauth_params
        .iter()
        .find(|(key, _)| key == SIGNATURE_PARAM)
        .map(|(_, value)| value.as_str())
        .ok_or(OAuthError::MissingParameter("oauth_signature"))?;

    if let Some(body) = body {
        let expected_hash = context
            .body_hash
            .as_deref()
            .ok_or(OAuthError::MissingParameter("oauth_body_hash"))?;
        if !constant_time_eq(expected_hash, &body_hash(body)) {
            return Err(OAuthError::BodyHashMismatch);
        }
    }

    let mut signed_params: Vec<(String, String)> = oauth_params.to_vec();
    signed_params.extend(request_params.iter().cloned());

    let base_string = signature_base_string(http_method, url, &signed_params)?;
    let expected = compute_signature(context.signature_method, &base_string, secret)?;

    if constant_time_eq(&expected, received) {
        Ok(context)
    } else {
        Err(OAuthError::SignatureMismatch)
    }
}

/// `OAuth realm="",oauth_...="..."` header value for a signed request.
pub fn authorization_header(context: &OAuthContext, signature: &str) -> String {
    let mut fields = vec![format!("{}=\"{}\"", REALM_PARAM, percent_encode(&context.realm))];
    fields.extend(
        context
            .params()
            .into_iter()
            .chain(std::iter::once((SIGNATURE_PARAM.to_string(), signature.to_string())))
            .map(|(key, value)| format!("{}=\"{}\"", key, percent_encode(&value))),
    );

    format!("OAuth {}", fields.join(","))
}

/// Splits an `Authorization: OAuth ...` header into decoded parameters.
pub fn parse_authorization_header(header: &str) -> Result<Vec<(String, String)>, OAuthError> {
    let header = header.trim();
    let rest = match header.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("OAuth ") => &header[6..],
        _ => return Err(OAuthError::MalformedHeader),
    };

    let mut params = Vec::new();
    for field in rest.split(',') {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }

        let (key, value) = field.split_once('=').ok_or(OAuthError::MalformedHeader)?;
        let value = value.trim().trim_matches('"');

        let key = urlencoding::decode(key.trim()).map_err(|_| OAuthError::MalformedHeader)?;
        let value = urlencoding::decode(value).map_err(|_| OAuthError::MalformedHeader)?;
        params.push((key.into_owned(), value.into_owned()));
    }

    if params.is_empty() {
        return Err(OAuthError::MalformedHeader);
    }

    Ok(params)
}

/// Rejects a request whose `oauth_timestamp` is more than `window_secs` away
/// from `now`.
pub fn check_timestamp(
    context: &OAuthContext,
    now: i64,
    window_secs: i64,
) -> Result<(), OAuthError> {
    if (now - context.timestamp).abs() > window_secs {
        return Err(OAuthError::StaleTimestamp);
    }
    Ok(())
}

/// Nonces accepted within the timestamp window, per consumer key.
///
/// Entries older than the window are dropped on every check; their
/// timestamps are rejected by [`check_timestamp`] anyway.
#[derive(Debug, Default)]
pub struct NonceStore {
    seen: HashMap<(String, String), i64>,
}

impl NonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_and_record(
        &mut self,
        context: &OAuthContext,
        now: i64,
        window_secs: i64,
    ) -> Result<(), OAuthError> {
        self.seen.retain(|_, timestamp| now - *timestamp <= window_secs);

        let key = (context.consumer_key.clone(), context.nonce.clone());
        if self.seen.contains_key(&key) {
            return Err(OAuthError::ReplayedNonce);
        }
        self.seen.insert(key, context.timestamp);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
