//! Tools built on the company directory (`/employees/directory`).
//!
//! The directory is fetched once and cached by the client, so searching and
//! building rosters filter locally instead of issuing one call per question.

use rmcp::{ErrorData, handler::server::wrapper::Parameters, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::mcp::{
    error::BambooHrError,
    http::BambooHrClient,
    tools::{records, tool_failure},
};

const DIRECTORY_ENDPOINT: &str = "/employees/directory";
const DEFAULT_SEARCH_LIMIT: usize = 25;
const SEARCH_FIELDS: &[&str] = &[
    "displayName",
    "firstName",
    "lastName",
    "preferredName",
    "workEmail",
    "jobTitle",
];

#[derive(Serialize, Deserialize, JsonSchema)]
pub struct EmployeeSearchRequest {
    #[schemars(description = "Text to match against names, work email or job title, e.g. \"jane\" or \"engineer\".")]
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Maximum number of matches to return. Defaults to 25.")]
    pub limit: Option<usize>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
pub struct TeamRosterRequest {
    #[schemars(description = "Department name, e.g. \"Engineering\". Matched case-insensitively.")]
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Optional division to narrow the roster, e.g. \"North America\".")]
    pub division: Option<String>,
}

fn field_matches(employee: &Value, field: &str, needle: &str) -> bool {
    employee[field]
        .as_str()
        .is_some_and(|value| value.to_lowercase().contains(needle))
}

fn field_equals(employee: &Value, field: &str, expected: &str) -> bool {
    employee[field]
        .as_str()
        .is_some_and(|value| value.trim().eq_ignore_ascii_case(expected))
}

pub fn search(directory: &Value, query: &str, limit: usize) -> Vec<Value> {
    let needle = query.trim().to_lowercase();
    records(directory)
        .iter()
        .filter(|employee| {
            SEARCH_FIELDS
                .iter()
                .any(|field| field_matches(employee, field, &needle))
        })
        .take(limit)
        .cloned()
        .collect()
}

pub fn roster(directory: &Value, department: &str, division: Option<&str>) -> Vec<Value> {
    records(directory)
        .iter()
        .filter(|employee| field_equals(employee, "department", department))
        .filter(|employee| division.is_none_or(|d| field_equals(employee, "division", d)))
        .cloned()
        .collect()
}

pub async fn find_employees(
    client: &BambooHrClient,
    Parameters(args): Parameters<EmployeeSearchRequest>,
) -> Result<CallToolResult, ErrorData> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err(BambooHrError::InvalidParams("query cannot be empty.".to_string()).into());
    }
    let limit = args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).max(1);

    let directory = match client.get(DIRECTORY_ENDPOINT).await {
        Ok(directory) => directory,
        Err(err) => return tool_failure(err),
    };
    let matches = search(&directory, query, limit);

    Ok(CallToolResult::structured(json!({
        "query": query,
        "count": matches.len(),
        "employees": matches,
    })))
}

pub async fn get_team_roster(
    client: &BambooHrClient,
    Parameters(args): Parameters<TeamRosterRequest>,
) -> Result<CallToolResult, ErrorData> {
    let department = args.department.trim();
    if department.is_empty() {
        return Err(BambooHrError::InvalidParams("department cannot be empty.".to_string()).into());
    }
    let division = args.division.as_deref().map(str::trim).filter(|d| !d.is_empty());

    let directory = match client.get(DIRECTORY_ENDPOINT).await {
        Ok(directory) => directory,
        Err(err) => return tool_failure(err),
    };
    let members = roster(&directory, department, division);

    Ok(CallToolResult::structured(json!({
        "department": department,
        "division": division,
        "count": members.len(),
        "employees": members,
    })))
}
