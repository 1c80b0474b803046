//! Turns failed responses and unparseable bodies into [`BambooHrError`]s.
//!
//! The BambooHR gateway answers some auth failures with an HTML page, and
//! large analytics payloads occasionally arrive truncated. Both cases must be
//! recognisable from the error message alone.

use reqwest::StatusCode;
use serde_json::Value;

use crate::mcp::error::BambooHrError;

const MAX_ERROR_TEXT_CHARS: usize = 500;

/// Builds the error for a response whose status is not a success.
pub fn error_from_response(status: StatusCode, body: &[u8]) -> BambooHrError {
    let status_line = format!(
        "BambooHR API error: {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    let text = String::from_utf8_lossy(body);
    let message = if text.trim().is_empty() {
        status_line.trim_end().to_string()
    } else {
        format!("{} - {}", status_line.trim_end(), extract_error_text(&text))
    };

    let status = status.as_u16();
    match status {
        429 => BambooHrError::RateLimited { status, message },
        500..=599 => BambooHrError::ServerError { status, message },
        _ => BambooHrError::ClientError { status, message },
    }
}

/// Message carried by an error body: JSON is mined for a message field, anything
/// else is returned raw, cut at 500 characters.
pub fn extract_error_text(text: &str) -> String {
    serde_json::from_str::<Value>(text).map_or_else(
        |_| truncate(text, MAX_ERROR_TEXT_CHARS),
        |json| extract_json_message(&json),
    )
}

fn extract_json_message(json: &Value) -> String {
    if let Value::String(s) = json {
        return s.clone();
    }
    if let Some(message) = json.get("message").filter(|v| !v.is_null()) {
        return value_text(message);
    }
    if let Some(error) = json.get("error").filter(|v| !v.is_null()) {
        return value_text(error);
    }
    if let Some(errors) = json.get("errors").and_then(Value::as_array) {
        return errors
            .iter()
            .map(|e| e.get("message").map_or_else(|| value_text(e), value_text))
            .collect::<Vec<_>>()
            .join(", ");
    }
    if let Some(detail) = json.get("detail").filter(|v| !v.is_null()) {
        return value_text(detail);
    }
    json.to_string()
}

fn value_text(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_string)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Parses the body of a successful response.
///
/// An empty body is `null`, not an error.
///
/// # Errors
/// `MalformedResponse` naming `endpoint`, worded differently for HTML,
/// truncated JSON and anything else that fails to parse.
pub fn parse_success_body(endpoint: &str, body: &[u8]) -> Result<Value, BambooHrError> {
    let text = std::str::from_utf8(body).map_err(|e| {
        BambooHrError::MalformedResponse(format!(
            "BambooHR API returned a non UTF-8 body for {endpoint}: {e}"
        ))
    })?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(trimmed).map_err(|e| {
        let message = if trimmed.starts_with('<') {
            format!(
                "BambooHR API returned HTML instead of JSON for {endpoint}. \
                 This usually means the API key or subdomain was rejected by the gateway."
            )
        } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
            format!(
                "Incomplete JSON response from BambooHR API for {endpoint}: \
                 the response appears to be truncated ({e})"
            )
        } else {
            format!("Invalid JSON response from BambooHR API for {endpoint}: {e}")
        };
        BambooHrError::MalformedResponse(message)
    })
}
