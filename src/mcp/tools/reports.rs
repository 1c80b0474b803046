//! Tools for custom reports saved in BambooHR.

use rmcp::{ErrorData, handler::server::wrapper::Parameters, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::mcp::{
    http::BambooHrClient,
    tools::{records, tool_failure, validate_id},
};

#[derive(Serialize, Deserialize, JsonSchema)]
pub struct CustomReportRequest {
    #[schemars(description = "Custom report id as returned by list_custom_reports, e.g. 17.")]
    pub report_id: String,
}

pub async fn list_custom_reports(client: &BambooHrClient) -> Result<CallToolResult, ErrorData> {
    match client.get("/custom-reports").await {
        Ok(reports) => Ok(CallToolResult::structured(json!({
            "count": records(&reports).len(),
            "reports": reports,
        }))),
        Err(err) => tool_failure(err),
    }
}

pub async fn run_custom_report(
    client: &BambooHrClient,
    Parameters(args): Parameters<CustomReportRequest>,
) -> Result<CallToolResult, ErrorData> {
    let report_id = validate_id("report_id", &args.report_id)?;

    match client.get(&format!("/custom-reports/{report_id}")).await {
        Ok(report) => Ok(CallToolResult::structured(json!({
            "report_id": report_id,
            "row_count": records(&report).len(),
            "report": report,
        }))),
        Err(err) => tool_failure(err),
    }
}
