//! Tools for leave calendars: who's out and time off requests.

use rmcp::{ErrorData, handler::server::wrapper::Parameters, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::mcp::{
    error::BambooHrError,
    http::{BambooHrClient, RequestOptions},
    tools::{date_window, records, tool_failure, validate_id},
};

const DEFAULT_WINDOW_DAYS: u64 = 14;
const REQUEST_STATUSES: &[&str] = &["approved", "denied", "superceded", "requested", "canceled"];

#[derive(Serialize, Deserialize, JsonSchema)]
pub struct WhosOutRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "First day of the window in YYYY-MM-DD format. Defaults to today.")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Last day of the window in YYYY-MM-DD format. Defaults to 14 days after start_date.")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Bypass the 5 minute cache and fetch the calendar fresh.")]
    pub refresh: Option<bool>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
pub struct TimeOffRequestsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "First day of the window in YYYY-MM-DD format. Defaults to today.")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Last day of the window in YYYY-MM-DD format. Defaults to 14 days after start_date.")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Only requests for this BambooHR employee id, e.g. 123.")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Only requests in this status: approved, denied, superceded, requested or canceled.")]
    pub status: Option<String>,
}

pub async fn get_whos_out(
    client: &BambooHrClient,
    Parameters(args): Parameters<WhosOutRequest>,
) -> Result<CallToolResult, ErrorData> {
    let (start, end) = date_window(
        args.start_date.as_deref(),
        args.end_date.as_deref(),
        DEFAULT_WINDOW_DAYS,
    )?;
    let endpoint = format!("/time_off/whos_out?start={start}&end={end}");
    let options = RequestOptions {
        skip_cache: args.refresh.unwrap_or(false),
    };

    match client.get_with(&endpoint, options).await {
        Ok(entries) => Ok(CallToolResult::structured(json!({
            "start": start.to_string(),
            "end": end.to_string(),
            "count": records(&entries).len(),
            "whos_out": entries,
        }))),
        Err(err) => tool_failure(err),
    }
}

/// # Errors
/// `InvalidParams` for a bad date window, employee id or status.
pub fn time_off_requests_endpoint(
    args: &TimeOffRequestsRequest,
) -> Result<String, BambooHrError> {
    let (start, end) = date_window(
        args.start_date.as_deref(),
        args.end_date.as_deref(),
        DEFAULT_WINDOW_DAYS,
    )?;
    let mut endpoint = format!("/time_off/requests?start={start}&end={end}");

    if let Some(employee_id) = args.employee_id.as_deref() {
        let employee_id = validate_id("employee_id", employee_id)?;
        endpoint.push_str(&format!("&employeeId={employee_id}"));
    }
    if let Some(status) = args.status.as_deref() {
        let status = status.trim().to_lowercase();
        if !REQUEST_STATUSES.contains(&status.as_str()) {
            return Err(BambooHrError::InvalidParams(format!(
                "status must be one of {}, got '{status}'.",
                REQUEST_STATUSES.join(", ")
            )));
        }
        endpoint.push_str(&format!("&status={status}"));
    }
    Ok(endpoint)
}

pub async fn get_time_off_requests(
    client: &BambooHrClient,
    Parameters(args): Parameters<TimeOffRequestsRequest>,
) -> Result<CallToolResult, ErrorData> {
    let endpoint = time_off_requests_endpoint(&args)?;

    match client.get(&endpoint).await {
        Ok(requests) => Ok(CallToolResult::structured(json!({
            "count": records(&requests).len(),
            "requests": requests,
        }))),
        Err(err) => tool_failure(err),
    }
}
