//! MCP tools for reading BambooHR data.
//!
//! Each module implements one family of tools:
//! - `employee`: Look up a single employee profile
//! - `directory`: Search the company directory and build department rosters
//! - `time_off`: Who's out calendar and time off requests
//! - `datasets`: Discovery-driven analytics over BambooHR datasets
//! - `reports`: Custom reports
//! - `photo`: Employee photos
//!
//! All tools use the shared `BambooHrClient` and the helpers below for
//! argument validation and error reporting.

pub mod datasets;
pub mod directory;
pub mod employee;
pub mod photo;
pub mod reports;
pub mod time_off;

use chrono::{Days, Local, NaiveDate};
use rmcp::{
    ErrorData,
    model::{CallToolResult, Content},
};
use serde_json::Value;
use tracing::warn;

use crate::mcp::error::BambooHrError;

/// Turns a client failure into an `isError` tool result with a hint for the
/// user. Bad arguments stay protocol errors.
pub fn tool_failure(err: BambooHrError) -> Result<CallToolResult, ErrorData> {
    if matches!(err, BambooHrError::InvalidParams(_)) {
        return Err(err.into());
    }
    warn!(status = ?err.status(), "BambooHR tool call failed: {err}");
    let text = guidance(&err)
        .map_or_else(|| err.to_string(), |hint| format!("{err}\n\n{hint}"));
    Ok(CallToolResult::error(vec![Content::text(text)]))
}

fn guidance(err: &BambooHrError) -> Option<&'static str> {
    match err {
        BambooHrError::ClientError { status: 401, .. } => Some(
            "The API key was rejected. Check BAMBOOHR_API_KEY and that the key has not been revoked.",
        ),
        BambooHrError::ClientError { status: 403, .. } => Some(
            "The API key lacks permission for this data. Ask a BambooHR admin to grant access to the key's user.",
        ),
        BambooHrError::ClientError { status: 404, .. } => {
            Some("Nothing was found. Check the identifier and try again.")
        }
        BambooHrError::RateLimited { .. } => {
            Some("BambooHR is rate limiting requests. Try again in a minute.")
        }
        BambooHrError::ServerError { .. } => {
            Some("BambooHR is having trouble right now. Try again shortly.")
        }
        BambooHrError::Timeout { .. } | BambooHrError::Network(_) => {
            Some("Could not reach BambooHR. Check network connectivity and try again.")
        }
        BambooHrError::MalformedResponse(message) if message.contains("HTML") => Some(
            "This usually means BAMBOOHR_SUBDOMAIN or BAMBOOHR_API_KEY is wrong.",
        ),
        _ => None,
    }
}

/// Identifiers interpolated into endpoint paths: letters, digits, `_` and `-`.
///
/// # Errors
/// `InvalidParams` for an empty value or any other character.
pub fn validate_id<'a>(name: &str, value: &'a str) -> Result<&'a str, BambooHrError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BambooHrError::InvalidParams(format!("{name} cannot be empty.")));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(BambooHrError::InvalidParams(format!(
            "{name} may only contain letters, digits, '_' and '-', got '{value}'."
        )));
    }
    Ok(value)
}

/// # Errors
/// `InvalidParams` unless `value` is a `YYYY-MM-DD` date.
pub fn parse_date(name: &str, value: &str) -> Result<NaiveDate, BambooHrError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        BambooHrError::InvalidParams(format!(
            "{name} must be a date in YYYY-MM-DD format, e.g. 2025-03-31, got '{value}'."
        ))
    })
}

/// Resolves an optional `[start, end]` window, defaulting to today and
/// `default_days` after the start.
///
/// # Errors
/// `InvalidParams` for unparseable dates or an end before the start.
pub fn date_window(
    start: Option<&str>,
    end: Option<&str>,
    default_days: u64,
) -> Result<(NaiveDate, NaiveDate), BambooHrError> {
    let start = start
        .map(|s| parse_date("start_date", s))
        .transpose()?
        .unwrap_or_else(|| Local::now().date_naive());
    let end = match end {
        Some(e) => parse_date("end_date", e)?,
        None => start
            .checked_add_days(Days::new(default_days))
            .unwrap_or(start),
    };
    if end < start {
        return Err(BambooHrError::InvalidParams(format!(
            "end_date {end} is before start_date {start}."
        )));
    }
    Ok((start, end))
}

/// Rows of a list payload. BambooHR wraps lists as `{employees: [...]}`,
/// `{data: [...]}`, `{records: [...]}` or sends a bare array.
pub fn records(json: &Value) -> &[Value] {
    if let Some(rows) = json.as_array() {
        return rows;
    }
    ["employees", "data", "records", "reports", "datasets", "fields"]
        .iter()
        .find_map(|key| json.get(key).and_then(Value::as_array))
        .map_or(&[][..], Vec::as_slice)
}
