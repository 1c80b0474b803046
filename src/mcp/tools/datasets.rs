//! Discovery-driven analytics over BambooHR datasets.
//!
//! The assistant is expected to list datasets, look at a dataset's fields, and
//! only then query it with field names it has actually seen.

use rmcp::{ErrorData, handler::server::wrapper::Parameters, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::mcp::{
    error::BambooHrError,
    http::BambooHrClient,
    tools::{records, tool_failure, validate_id},
};

#[derive(Serialize, Deserialize, JsonSchema)]
pub struct DatasetRequest {
    #[schemars(description = "Dataset name as returned by list_datasets, e.g. \"employee\".")]
    pub dataset_id: String,
}

#[derive(Serialize, Deserialize, JsonSchema)]
pub struct DatasetQueryRequest {
    #[schemars(description = "Dataset name as returned by list_datasets, e.g. \"employee\".")]
    pub dataset_id: String,
    #[schemars(description = "Field names from get_dataset_fields, e.g. [\"firstName\", \"department\"].")]
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "Optional BambooHR filter object, e.g. {\"match\": \"all\", \"filters\": [{\"field\": \"status\", \"operator\": \"equal\", \"value\": \"Active\"}]}."
    )]
    pub filters: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Optional sort, e.g. [{\"field\": \"lastName\", \"sort\": \"asc\"}].")]
    pub sort_by: Option<Value>,
}

pub async fn list_datasets(client: &BambooHrClient) -> Result<CallToolResult, ErrorData> {
    match client.get("/datasets").await {
        Ok(datasets) => Ok(CallToolResult::structured(json!({ "datasets": datasets }))),
        Err(err) => tool_failure(err),
    }
}

pub async fn get_dataset_fields(
    client: &BambooHrClient,
    Parameters(args): Parameters<DatasetRequest>,
) -> Result<CallToolResult, ErrorData> {
    let dataset_id = validate_id("dataset_id", &args.dataset_id)?;

    match client.get(&format!("/datasets/{dataset_id}/fields")).await {
        Ok(fields) => Ok(CallToolResult::structured(json!({
            "dataset_id": dataset_id,
            "fields": fields,
        }))),
        Err(err) => tool_failure(err),
    }
}

/// Request body for `POST /datasets/{id}`.
///
/// # Errors
/// `InvalidParams` when no non-blank field is requested.
pub fn query_body(args: &DatasetQueryRequest) -> Result<Value, BambooHrError> {
    let fields: Vec<&str> = args
        .fields
        .iter()
        .map(String::as_str)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    if fields.is_empty() {
        return Err(BambooHrError::InvalidParams(
            "fields must name at least one field; call get_dataset_fields to discover them."
                .to_string(),
        ));
    }

    let mut body = Map::new();
    body.insert("fields".to_string(), json!(fields));
    if let Some(filters) = args.filters.clone().filter(|f| !f.is_null()) {
        body.insert("filters".to_string(), filters);
    }
    if let Some(sort_by) = args.sort_by.clone().filter(|s| !s.is_null()) {
        body.insert("sortBy".to_string(), sort_by);
    }
    Ok(Value::Object(body))
}

pub async fn query_dataset(
    client: &BambooHrClient,
    Parameters(args): Parameters<DatasetQueryRequest>,
) -> Result<CallToolResult, ErrorData> {
    let dataset_id = validate_id("dataset_id", &args.dataset_id)?;
    let body = query_body(&args)?;

    match client.post(&format!("/datasets/{dataset_id}"), &body).await {
        Ok(result) => Ok(CallToolResult::structured(json!({
            "dataset_id": dataset_id,
            "row_count": records(&result).len(),
            "result": result,
        }))),
        Err(err) => tool_failure(err),
    }
}
