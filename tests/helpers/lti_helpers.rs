use rosterlink::lti::oauth::{self, OAuthContext, SignatureMethod};
use rosterlink::lti::outcome::DEFAULT_XML_NAMESPACE;

use super::test_db::OUTCOME_URL;

/// replaceResult envelope as sent by a delivery tool.
pub fn replace_result_envelope(sourced_id: &str, score: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<imsx_POXEnvelopeRequest xmlns="{ns}">
  <imsx_POXHeader>
    <imsx_POXRequestHeaderInfo>
      <imsx_version>V1.0</imsx_version>
      <imsx_messageIdentifier>msg-42</imsx_messageIdentifier>
    </imsx_POXRequestHeaderInfo>
  </imsx_POXHeader>
  <imsx_POXBody>
    <replaceResultRequest>
      <resultRecord>
        <sourcedGUID>
          <sourcedId>{sourced_id}</sourcedId>
        </sourcedGUID>
        <result>
          <resultScore>
            <language>en</language>
            <textString>{score}</textString>
          </resultScore>
        </result>
      </resultRecord>
    </replaceResultRequest>
  </imsx_POXBody>
</imsx_POXEnvelopeRequest>"#,
        ns = DEFAULT_XML_NAMESPACE,
        sourced_id = sourced_id,
        score = score
    )
}

/// `Authorization` header a delivery tool would send with `body`.
pub fn sign_outcome(body: &str, key: &str, secret: &str) -> String {
    let context = OAuthContext::new(key, SignatureMethod::HmacSha1).with_body(body.as_bytes());
    sign_context(&context, secret)
}

/// Signs an outcome request with a prepared context, body hash included or not.
pub fn sign_context(context: &OAuthContext, secret: &str) -> String {
    let signature = oauth::sign(context, OUTCOME_URL, "POST", secret, &[])
        .expect("Failed to sign outcome");
    oauth::authorization_header(context, &signature)
}
