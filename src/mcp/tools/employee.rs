//! Tool for looking up a single employee's profile in BambooHR.
//!
//! Employee id `0` refers to the employee that owns the API key.

use rmcp::{ErrorData, handler::server::wrapper::Parameters, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::mcp::{
    http::BambooHrClient,
    tools::{tool_failure, validate_id},
};

pub const DEFAULT_EMPLOYEE_FIELDS: &[&str] = &[
    "firstName",
    "lastName",
    "displayName",
    "preferredName",
    "jobTitle",
    "department",
    "division",
    "location",
    "workEmail",
    "workPhone",
    "mobilePhone",
    "supervisor",
    "hireDate",
    "employmentHistoryStatus",
];

#[derive(Serialize, Deserialize, JsonSchema)]
pub struct EmployeeRequest {
    #[schemars(description = "BambooHR employee id, e.g. 123. Use 0 for the API key's own employee record.")]
    pub employee_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "BambooHR field names to return, e.g. [\"jobTitle\", \"hireDate\"]. Defaults to common profile fields."
    )]
    pub fields: Option<Vec<String>>,
}

/// `/employees/{id}?fields=a,b,c`
pub fn employee_endpoint(employee_id: &str, fields: &[String]) -> String {
    format!("/employees/{employee_id}?fields={}", fields.join(","))
}

pub async fn get_employee(
    client: &BambooHrClient,
    Parameters(args): Parameters<EmployeeRequest>,
) -> Result<CallToolResult, ErrorData> {
    let employee_id = validate_id("employee_id", &args.employee_id)?;

    let fields: Vec<String> = match args.fields {
        Some(fields) if !fields.is_empty() => fields
            .iter()
            .map(|f| validate_id("fields", f).map(str::to_string))
            .collect::<Result<_, _>>()?,
        _ => DEFAULT_EMPLOYEE_FIELDS.iter().map(|f| (*f).to_string()).collect(),
    };

    match client.get(&employee_endpoint(employee_id, &fields)).await {
        Ok(employee) => Ok(CallToolResult::structured(json!({ "employee": employee }))),
        Err(err) => tool_failure(err),
    }
}
