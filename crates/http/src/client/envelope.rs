//! Parsing of error payloads
//!
//! Two shapes are recognized: business errors some backends return with a
//! 2xx status (`{"code": 403, "message": "..."}`), and the error bodies that
//! accompany non-2xx statuses (`{"message", "details", "traceId"}`).

use super::error::{ApiError, ErrorKind};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

/// `code` field of an embedded error, numeric or symbolic
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddedCode {
    Number(i64),
    Text(String),
}

impl EmbeddedCode {
    fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Number(403) => Some(ErrorKind::PermissionDenied),
            Self::Number(404) => Some(ErrorKind::NotFound),
            Self::Number(500) => Some(ErrorKind::Server),
            Self::Number(_) => None,
            Self::Text(code) => match code.as_str() {
                "403" | "PERMISSION_DENIED" | "FORBIDDEN" => Some(ErrorKind::PermissionDenied),
                "404" | "NOT_FOUND" | "RESOURCE_NOT_FOUND" => Some(ErrorKind::NotFound),
                "500" | "INTERNAL_ERROR" | "SYS_INTERNAL_ERROR" => Some(ErrorKind::Server),
                _ => None,
            },
        }
    }
}

/// Error envelope carried inside a 2xx response. Both fields are required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddedError {
    code: EmbeddedCode,
    message: String,
    #[serde(default)]
    trace_id: Option<String>,
}

/// Detect a business error in a successful response body
///
/// Returns `None` for anything that is not an object carrying both `code`
/// and `message` with a recognized error code; such bodies are ordinary
/// payloads (`{"code": 200, "data": [...]}` included).
pub fn embedded_error(body: &Value) -> Option<ApiError> {
    if !body.is_object() {
        return None;
    }
    let envelope = EmbeddedError::deserialize(body).ok()?;
    let kind = envelope.code.kind()?;
    let status = match kind {
        ErrorKind::PermissionDenied => 403,
        ErrorKind::NotFound => 404,
        _ => 500,
    };

    Some(
        ApiError::new(kind, envelope.message)
            .with_status(status)
            .with_trace_id(envelope.trace_id),
    )
}

/// Message and trace id extracted from a non-2xx response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
    pub trace_id: Option<String>,
}

/// Extract a single user-facing message from an error response body
///
/// Field-level validation details are joined into the message as
/// `field: reason` pairs separated by `; `.
pub fn error_body(status: StatusCode, body: &str) -> ErrorBody {
    let fallback = || status.canonical_reason().unwrap_or("Request failed").to_string();
    let trimmed = body.trim();

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        let message = if trimmed.is_empty() {
            fallback()
        } else {
            trimmed.to_string()
        };
        return ErrorBody {
            message,
            trace_id: None,
        };
    };

    let object = match value {
        Value::Object(object) => object,
        Value::String(text) if !text.is_empty() => {
            return ErrorBody {
                message: text,
                trace_id: None,
            };
        }
        Value::String(_) | Value::Null => {
            return ErrorBody {
                message: fallback(),
                trace_id: None,
            };
        }
        other => {
            return ErrorBody {
                message: other.to_string(),
                trace_id: None,
            };
        }
    };

    let base = ["message", "error", "msg"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .filter(|text| !text.is_empty());
    let details = object
        .get("details")
        .or_else(|| object.get("errors"))
        .and_then(join_details);

    let message = match (base, details) {
        (Some(base), Some(details)) => format!("{base}: {details}"),
        (Some(base), None) => base.to_string(),
        (None, Some(details)) => details,
        (None, None) => fallback(),
    };
    let trace_id = object
        .get("traceId")
        .and_then(Value::as_str)
        .map(str::to_string);

    ErrorBody { message, trace_id }
}

fn join_details(details: &Value) -> Option<String> {
    let parts: Vec<String> = match details {
        Value::Object(fields) => fields
            .iter()
            .map(|(field, reason)| format!("{field}: {}", scalar_text(reason)))
            .collect(),
        Value::Array(items) => items.iter().filter_map(detail_item).collect(),
        Value::String(text) if !text.is_empty() => vec![text.clone()],
        _ => Vec::new(),
    };

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

fn detail_item(item: &Value) -> Option<String> {
    match item {
        Value::String(text) => Some(text.clone()),
        Value::Object(fields) => {
            let reason = fields
                .get("message")
                .or_else(|| fields.get("defaultMessage"))
                .map(scalar_text)?;
            match fields.get("field").and_then(Value::as_str) {
                Some(field) => Some(format!("{field}: {reason}")),
                None => Some(reason),
            }
        }
        _ => None,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
