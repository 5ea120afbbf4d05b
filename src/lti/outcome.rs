//! IMS Basic Outcomes (POX) envelopes exchanged with delivery tools.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::domain::errors::{DomainError, DomainResult};

pub const DEFAULT_XML_NAMESPACE: &str =
    "http://www.imsglobal.org/services/ltiv1p1/xsd/imsoms_v1p0";

const REQUEST_ROOT: &str = "imsx_POXEnvelopeRequest";
const BODY: &str = "imsx_POXBody";
const REPLACE_RESULT_REQUEST: &str = "replaceResultRequest";

/// What a replaceResult request tells us.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceResultRequest {
    pub message_identifier: Option<String>,
    pub sourced_id: String,
    pub score: Option<f64>,
}

/// Parses a replaceResult envelope.
pub fn parse_replace_result(xml: &str) -> DomainResult<ReplaceResultRequest> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut root: Option<String> = None;
    let mut operation: Option<String> = None;
    let mut message_identifier = None;
    let mut sourced_id = None;
    let mut score_text = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                record_element(&path, &name, &mut root, &mut operation);
                path.push(name);
            }
            Ok(Event::Empty(element)) => {
                let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                record_element(&path, &name, &mut root, &mut operation);
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(text)) => {
                let value = text
                    .unescape()
                    .map_err(|e| invalid_body(format!("cannot unescape text: {}", e)))?
                    .into_owned();
                assign_text(
                    &path,
                    value,
                    &mut message_identifier,
                    &mut sourced_id,
                    &mut score_text,
                );
            }
            Ok(Event::CData(data)) => {
                let value = String::from_utf8_lossy(&data.into_inner()).trim().to_string();
                assign_text(
                    &path,
                    value,
                    &mut message_identifier,
                    &mut sourced_id,
                    &mut score_text,
                );
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(invalid_body(format!(
                    "malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    if !path.is_empty() {
        return Err(invalid_body(format!("unclosed element '{}'", path.join("/"))));
    }

    match root.as_deref() {
        Some(REQUEST_ROOT) => {}
        Some(other) => return Err(invalid_body(format!("unexpected root element '{}'", other))),
        None => return Err(invalid_body("empty document".to_string())),
    }

    match operation.as_deref() {
        Some(REPLACE_RESULT_REQUEST) => {}
        Some(other) => return Err(invalid_body(format!("unsupported operation '{}'", other))),
        None => return Err(invalid_body("missing operation".to_string())),
    }

    let sourced_id = sourced_id
        .filter(|id: &String| !id.is_empty())
        .ok_or_else(|| invalid_body("missing sourcedId".to_string()))?;

    let score = score_text
        .map(|text: String| {
            text.parse::<f64>()
                .ok()
                .filter(|score| (0.0..=1.0).contains(score))
                .ok_or_else(|| invalid_body(format!("invalid result score '{}'", text)))
        })
        .transpose()?;

    Ok(ReplaceResultRequest {
        message_identifier,
        sourced_id,
        score,
    })
}

fn record_element(
    path: &[String],
    name: &str,
    root: &mut Option<String>,
    operation: &mut Option<String>,
) {
    if path.is_empty() && root.is_none() {
        *root = Some(name.to_string());
    }
    if path.last().map(String::as_str) == Some(BODY) && operation.is_none() {
        *operation = Some(name.to_string());
    }
}

fn assign_text(
    path: &[String],
    value: String,
    message_identifier: &mut Option<String>,
    sourced_id: &mut Option<String>,
    score_text: &mut Option<String>,
) {
    let tail: Vec<&str> = path.iter().rev().take(2).map(String::as_str).collect();
    match tail.as_slice() {
        ["imsx_messageIdentifier", ..] => *message_identifier = Some(value),
        ["sourcedId", "sourcedGUID"] => *sourced_id = Some(value),
        ["textString", "resultScore"] => *score_text = Some(value),
        _ => {}
    }
}

fn invalid_body(reason: String) -> DomainError {
    DomainError::InvalidProtocolBody(format!("Invalid replaceResult envelope: {}", reason))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeMajor {
    Success,
    Failure,
}

impl CodeMajor {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeMajor::Success => "success",
            CodeMajor::Failure => "failure",
        }
    }

    fn severity(&self) -> &'static str {
        match self {
            CodeMajor::Success => "status",
            CodeMajor::Failure => "error",
        }
    }
}

/// Acknowledgement sent back to the delivery tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeResponse {
    pub message_identifier: String,
    pub message_ref_identifier: Option<String>,
    pub code_major: CodeMajor,
    pub description: String,
    pub sourced_id: Option<String>,
}

impl OutcomeResponse {
    pub fn success(request: &ReplaceResultRequest) -> Self {
        Self {
            message_identifier: uuid::Uuid::new_v4().to_string(),
            message_ref_identifier: request.message_identifier.clone(),
            code_major: CodeMajor::Success,
            description: format!("Assignment with sourcedId {} is completed", request.sourced_id),
            sourced_id: Some(request.sourced_id.clone()),
        }
    }

    pub fn failure(description: impl Into<String>) -> Self {
        Self {
            message_identifier: uuid::Uuid::new_v4().to_string(),
            message_ref_identifier: None,
            code_major: CodeMajor::Failure,
            description: description.into(),
            sourced_id: None,
        }
    }

    pub fn to_xml(&self, namespace: &str) -> String {
        let body = match &self.sourced_id {
            Some(sourced_id) if self.code_major == CodeMajor::Success => format!(
                "<replaceResultResponse><sourcedGUID><sourcedId>{}</sourcedId>\
                 </sourcedGUID></replaceResultResponse>",
                escape(sourced_id.as_str())
            ),
            _ => String::new(),
        };

        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<imsx_POXEnvelopeResponse xmlns="{ns}">"#,
                "<imsx_POXHeader><imsx_POXResponseHeaderInfo>",
                "<imsx_version>V1.0</imsx_version>",
                "<imsx_messageIdentifier>{id}</imsx_messageIdentifier>",
                "<imsx_statusInfo>",
                "<imsx_codeMajor>{code}</imsx_codeMajor>",
                "<imsx_severity>{severity}</imsx_severity>",
                "<imsx_description>{description}</imsx_description>",
                "<imsx_messageRefIdentifier>{message_ref}</imsx_messageRefIdentifier>",
                "<imsx_operationRefIdentifier>replaceResult</imsx_operationRefIdentifier>",
                "</imsx_statusInfo>",
                "</imsx_POXResponseHeaderInfo></imsx_POXHeader>",
                "<imsx_POXBody>{body}</imsx_POXBody>",
                "</imsx_POXEnvelopeResponse>"
            ),
            ns = escape(namespace),
            id = escape(self.message_identifier.as_str()),
            code = self.code_major.as_str(),
            severity = self.code_major.severity(),
            description = escape(self.description.as_str()),
            message_ref = escape(self.message_ref_identifier.as_deref().unwrap_or_default()),
            body = body,
        )
    }
}
