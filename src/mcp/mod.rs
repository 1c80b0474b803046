//! BambooHR Model Context Protocol implementation.
//!
//! This crate provides read-only MCP tools over BambooHR's REST API.
//! The implementation is organized into:
//!
//! - `error`: Error types and conversions
//! - `http`: HTTP client with caching, retries and error normalization
//! - `tools`: Individual MCP tools for specific HR questions
//!
//! The main entry point is the `BambooHrMcpFactory` which provides the MCP server
//! implementation and manages all tools.

pub mod error;
pub mod http;
pub mod tools;

use std::sync::Arc;

use axum::http::request;
use rmcp::{
    ErrorData, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Implementation, InitializeRequestParam, InitializeResult,
        ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use tracing::info;

use crate::mcp::http::BambooHrClient;

// Tool modules and commonly used tool types
use crate::mcp::tools::{
    datasets::{self, DatasetQueryRequest, DatasetRequest},
    directory::{self, EmployeeSearchRequest, TeamRosterRequest},
    employee::{self, EmployeeRequest},
    photo::{self, PhotoRequest},
    reports::{self, CustomReportRequest},
    time_off::{self, TimeOffRequestsRequest, WhosOutRequest},
};

#[derive(Clone)]
pub struct BambooHrMcpFactory {
    client: Arc<BambooHrClient>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl BambooHrMcpFactory {
    /// One factory per MCP session; all sessions share the client and its cache.
    pub fn new(client: Arc<BambooHrClient>) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    // Thin delegating methods so the `tool_router` proc-macro (which scans
    // this impl block) can discover and register the tools. These simply
    // forward to the actual implementations in `mcp::tools::*`.

    #[tool(
        description = "Get a BambooHR employee's profile (name, job title, department, manager, contact details, hire date) by employee id. Use find_employees first if you only know a name."
    )]
    async fn get_employee(
        &self,
        params: Parameters<EmployeeRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        employee::get_employee(&self.client, params).await
    }

    #[tool(
        description = "Search the company directory by name, work email or job title. Returns matching employees with their ids."
    )]
    async fn find_employees(
        &self,
        params: Parameters<EmployeeSearchRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        directory::find_employees(&self.client, params).await
    }

    #[tool(
        description = "List everyone in a department (optionally narrowed to a division) from the company directory."
    )]
    async fn get_team_roster(
        &self,
        params: Parameters<TeamRosterRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        directory::get_team_roster(&self.client, params).await
    }

    #[tool(
        description = "Who is out of office between two dates (YYYY-MM-DD), including company holidays. Defaults to the next 14 days."
    )]
    async fn get_whos_out(
        &self,
        params: Parameters<WhosOutRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        time_off::get_whos_out(&self.client, params).await
    }

    #[tool(
        description = "Time off requests between two dates (YYYY-MM-DD), optionally for one employee or one status (approved, denied, superceded, requested, canceled)."
    )]
    async fn get_time_off_requests(
        &self,
        params: Parameters<TimeOffRequestsRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        time_off::get_time_off_requests(&self.client, params).await
    }

    #[tool(
        description = "List the BambooHR datasets available for analytics. Start here before querying workforce data."
    )]
    async fn list_datasets(&self) -> Result<CallToolResult, ErrorData> {
        datasets::list_datasets(&self.client).await
    }

    #[tool(
        description = "List the fields of a BambooHR dataset. Use the returned field names with query_dataset."
    )]
    async fn get_dataset_fields(
        &self,
        params: Parameters<DatasetRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        datasets::get_dataset_fields(&self.client, params).await
    }

    #[tool(
        description = "Query a BambooHR dataset for the given fields, with optional filters and sorting, for headcount and workforce analytics."
    )]
    async fn query_dataset(
        &self,
        params: Parameters<DatasetQueryRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        datasets::query_dataset(&self.client, params).await
    }

    #[tool(description = "List the custom reports saved in BambooHR.")]
    async fn list_custom_reports(&self) -> Result<CallToolResult, ErrorData> {
        reports::list_custom_reports(&self.client).await
    }

    #[tool(description = "Run a saved BambooHR custom report by id and return its rows.")]
    async fn run_custom_report(
        &self,
        params: Parameters<CustomReportRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        reports::run_custom_report(&self.client, params).await
    }

    #[tool(
        description = "Get an employee's photo by employee id, as an inline image plus a link."
    )]
    async fn get_employee_photo(
        &self,
        params: Parameters<PhotoRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        photo::get_employee_photo(&self.client, params).await
    }
}

#[tool_handler]
impl ServerHandler for BambooHrMcpFactory {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "BambooHR MCP Server with read-only tools for employees, time off, team rosters, datasets, custom reports and photos"
                    .to_string(),
            ),
        }
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, ErrorData> {
        if let Some(http_request_part) = context.extensions.get::<request::Parts>() {
            let initialize_uri = &http_request_part.uri;
            info!(%initialize_uri, "initialize from http server");
        }
        Ok(self.get_info())
    }
}
